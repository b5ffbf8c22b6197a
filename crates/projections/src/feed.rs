//! Live fan-out of results to connected customers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use common::CustomerId;
use domain::PurchaseResult;
use tokio::sync::mpsc;

const CONNECTION_BUFFER: usize = 16;

struct Connection {
    customer_id: CustomerId,
    sender: mpsc::Sender<PurchaseResult>,
}

#[derive(Default)]
struct Registry {
    connections: Mutex<HashMap<u64, Connection>>,
    next_id: AtomicU64,
}

/// Routes incoming results to the customers currently listening.
///
/// Each attached connection only ever sees results addressed to its own
/// customer. Detaching happens on drop of the subscription, so a closed
/// HTTP connection stops receiving immediately.
#[derive(Clone, Default)]
pub struct ResultFeed {
    registry: Arc<Registry>,
}

impl ResultFeed {
    /// Creates a feed with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for one customer's results.
    pub fn attach(&self, customer_id: CustomerId) -> ResultSubscription {
        let (sender, receiver) = mpsc::channel(CONNECTION_BUFFER);
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                id,
                Connection {
                    customer_id,
                    sender,
                },
            );
        ResultSubscription {
            receiver,
            registry: Arc::clone(&self.registry),
            id,
        }
    }

    /// Delivers a result to every connection of the addressed customer.
    ///
    /// Connections of other customers never see it. A connection whose
    /// buffer is full misses this update; it still holds the cache
    /// snapshot and receives the next one.
    pub fn deliver(&self, customer_id: CustomerId, result: PurchaseResult) {
        let connections = self
            .registry
            .connections
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        for connection in connections.values() {
            if connection.customer_id == customer_id && connection.sender.try_send(result).is_err()
            {
                tracing::debug!(%customer_id, "listener buffer full, frame skipped");
            }
        }
    }

    /// Number of currently attached listeners.
    pub fn listener_count(&self) -> usize {
        self.registry
            .connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// One customer's live result stream. Detaches from the feed on drop.
pub struct ResultSubscription {
    receiver: mpsc::Receiver<PurchaseResult>,
    registry: Arc<Registry>,
    id: u64,
}

impl ResultSubscription {
    /// Waits for the next result addressed to this customer.
    pub async fn recv(&mut self) -> Option<PurchaseResult> {
        self.receiver.recv().await
    }
}

impl futures_core::Stream for ResultSubscription {
    type Item = PurchaseResult;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for ResultSubscription {
    fn drop(&mut self) {
        self.registry
            .connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}
