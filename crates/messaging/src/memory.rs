//! In-memory event bus for tests and single-process wiring.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::bus::{Delivery, MessageStream, Publisher, Subscriber};
use crate::error::MessagingError;
use crate::message::Message;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast-based bus: every subscriber of a topic sees every message
/// published after it subscribed (fan-out semantics).
///
/// There is no offset ledger; an unacknowledged delivery is simply gone.
/// The bus counts acknowledgments so tests can assert whether a consumer
/// acked what it processed.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<Message>>>>,
    acked: Arc<AtomicU64>,
}

impl InMemoryEventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of deliveries acknowledged across all subscriptions.
    pub fn acked_count(&self) -> u64 {
        self.acked.load(Ordering::SeqCst)
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Message> {
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl Publisher for InMemoryEventBus {
    async fn publish(&self, topic: &str, message: Message) -> Result<(), MessagingError> {
        // A send error only means no subscriber is currently attached;
        // the broker analogue accepts messages regardless.
        let _ = self.sender(topic).send(message);
        Ok(())
    }
}

#[async_trait]
impl Subscriber for InMemoryEventBus {
    async fn subscribe(&self, topic: &str) -> Result<MessageStream, MessagingError> {
        let receiver = self.sender(topic).subscribe();
        let topic_name = topic.to_string();
        let acked = Arc::clone(&self.acked);
        let stream = BroadcastStream::new(receiver).map(move |item| match item {
            Ok(message) => {
                let acked = Arc::clone(&acked);
                Ok(Delivery::with_ack(
                    message,
                    Box::new(move || {
                        acked.fetch_add(1, Ordering::SeqCst);
                    }),
                ))
            }
            Err(_) => Err(MessagingError::Closed {
                topic: topic_name.clone(),
            }),
        });
        Ok(Box::pin(stream))
    }
}
