//! Command publication to the event stream.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use common::CorrelationId;
use domain::Purchase;
use domain::wire::CreatePurchaseCommand;
use messaging::{Message, PURCHASE_TOPIC, Publisher, TraceContext};

use crate::error::PurchaseError;

/// Publishes validated purchases as durable commands.
#[async_trait]
pub trait PurchasingRepository: Send + Sync {
    /// Converts one purchase into exactly one outbound command.
    ///
    /// Returns the correlation identifier minted for this publish once
    /// the broker durably accepts the message. Publication is
    /// at-least-once; a retry by the caller may enqueue a duplicate
    /// command, which the orchestrator handles idempotently.
    async fn create_purchase(&self, purchase: &Purchase) -> Result<CorrelationId, PurchaseError>;
}

/// Production implementation over the event-stream publisher.
pub struct EventPublishingRepository<P: Publisher> {
    publisher: Arc<P>,
}

impl<P: Publisher> EventPublishingRepository<P> {
    /// Wraps a connected publisher.
    pub fn new(publisher: Arc<P>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl<P: Publisher> PurchasingRepository for EventPublishingRepository<P> {
    #[tracing::instrument(skip(self, purchase), fields(customer_id = %purchase.order.customer_id))]
    async fn create_purchase(&self, purchase: &Purchase) -> Result<CorrelationId, PurchaseError> {
        let command = CreatePurchaseCommand::from_purchase(purchase, Utc::now());
        let payload = serde_json::to_vec(&command)?;

        let mut message = Message::new(payload);
        let correlation_id = CorrelationId::new();
        message.set_correlation_id(correlation_id);
        message.set_trace_context(&TraceContext::start_sampled());

        self.publisher.publish(PURCHASE_TOPIC, message).await?;

        metrics::counter!("purchase_commands_published_total").increment(1);
        tracing::info!(%correlation_id, "purchase command published");
        Ok(correlation_id)
    }
}

/// Test double recording every published purchase.
#[derive(Default)]
pub struct InMemoryPurchasingRepository {
    published: Mutex<Vec<Purchase>>,
    fail_on_publish: std::sync::atomic::AtomicBool,
}

impl InMemoryPurchasingRepository {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next publish calls fail.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.fail_on_publish
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Purchases published so far.
    pub fn published(&self) -> Vec<Purchase> {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of publish calls that succeeded.
    pub fn publish_count(&self) -> usize {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl PurchasingRepository for InMemoryPurchasingRepository {
    async fn create_purchase(&self, purchase: &Purchase) -> Result<CorrelationId, PurchaseError> {
        if self
            .fail_on_publish
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(PurchaseError::Publish(
                messaging::MessagingError::PublishFailed {
                    topic: PURCHASE_TOPIC.to_string(),
                    reason: "broker rejected".to_string(),
                },
            ));
        }
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(purchase.clone());
        Ok(CorrelationId::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerId, ProductId};
    use domain::wire::CreatePurchaseCommand;
    use domain::{CartItem, ProductCondition, ProductStatus};
    use futures_util::StreamExt;
    use messaging::{InMemoryEventBus, Subscriber};

    fn purchase() -> Purchase {
        let items = vec![CartItem::new(ProductId::new(7), 2)];
        let statuses = [ProductStatus {
            product_id: ProductId::new(7),
            unit_price: 50,
            status: ProductCondition::Ok,
        }];
        Purchase::from_validated(CustomerId::new(1), items, &statuses, "NT".to_string())
    }

    #[tokio::test]
    async fn publishes_one_command_with_metadata() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut stream = bus.subscribe(PURCHASE_TOPIC).await.unwrap();
        let repo = EventPublishingRepository::new(Arc::clone(&bus));

        let correlation_id = repo.create_purchase(&purchase()).await.unwrap();

        let message = stream.next().await.unwrap().unwrap().message;
        assert_eq!(message.correlation_id(), Some(correlation_id));
        assert!(message.trace_context().is_some());

        let command: CreatePurchaseCommand = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(command.purchase.order.customer_id, 1);
        assert_eq!(command.purchase.order.purchased_items.len(), 1);
        assert_eq!(command.purchase.order.purchased_items[0].product_id, 7);
        assert_eq!(command.purchase.order.purchased_items[0].amount, 2);
        assert_eq!(command.purchase.payment.amount, 100);
    }

    #[tokio::test]
    async fn each_publish_mints_a_fresh_correlation_id() {
        let bus = Arc::new(InMemoryEventBus::new());
        let repo = EventPublishingRepository::new(Arc::clone(&bus));

        let first = repo.create_purchase(&purchase()).await.unwrap();
        let second = repo.create_purchase(&purchase()).await.unwrap();
        assert_ne!(first, second);
    }
}
