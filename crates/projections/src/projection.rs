//! Applies result events to the cache and the live feed.

use std::sync::Arc;

use domain::wire::PurchaseResultMessage;
use messaging::Message;

use crate::cache::ResultStore;
use crate::error::ProjectionError;
use crate::feed::ResultFeed;

/// Materializes `purchase.result` events into the per-customer store and
/// pushes them to attached listeners.
///
/// Delivery is at least once, so applying an event must be idempotent;
/// overwriting the store entry satisfies that. Malformed payloads are
/// logged and dropped rather than wedging the subscription, while store
/// failures propagate so the message is not acknowledged.
pub struct ResultProjection {
    store: Arc<dyn ResultStore>,
    feed: ResultFeed,
}

impl ResultProjection {
    /// Creates a projection writing to `store` and fanning out on `feed`.
    pub fn new(store: Arc<dyn ResultStore>, feed: ResultFeed) -> Self {
        Self { store, feed }
    }

    /// Applies one result event.
    #[tracing::instrument(skip(self, message), fields(message_id = %message.id))]
    pub async fn apply(&self, message: &Message) -> Result<(), ProjectionError> {
        let wire: PurchaseResultMessage = match serde_json::from_slice(&message.payload) {
            Ok(wire) => wire,
            Err(error) => {
                tracing::warn!(%error, "malformed result payload, dropping");
                metrics::counter!("purchase_results_malformed_total").increment(1);
                return Ok(());
            }
        };

        let (customer_id, result) = wire.into_result();
        self.store.set(customer_id, result).await?;
        self.feed.deliver(customer_id, result);

        metrics::counter!("purchase_results_applied_total").increment(1);
        tracing::debug!(%customer_id, step = %result.step, status = %result.status, "result applied");
        Ok(())
    }
}
