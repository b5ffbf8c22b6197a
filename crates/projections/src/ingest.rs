//! Background ingestion of result events from the event stream.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use messaging::{PURCHASE_RESULT_TOPIC, Subscriber};
use tokio::task::JoinHandle;

use crate::projection::ResultProjection;

const RESUBSCRIBE_BACKOFF: Duration = Duration::from_secs(1);

/// Consumes the `purchase.result` topic and drives the projection.
///
/// Runs a configurable number of concurrent workers; each holds its own
/// subscription within the same consumer group, so partitions are
/// processed in parallel. A delivery is acknowledged only after the
/// projection applies it; on a failed apply the worker drops the
/// subscription without acking, so the event is redelivered once the
/// subscription is re-established. A broken subscription is likewise
/// re-established after a short pause.
pub struct ResultIngestor<S: Subscriber + 'static> {
    subscriber: Arc<S>,
    projection: Arc<ResultProjection>,
    workers: usize,
}

impl<S: Subscriber + 'static> ResultIngestor<S> {
    /// Creates an ingestor with `workers` concurrent consumers.
    pub fn new(subscriber: Arc<S>, projection: Arc<ResultProjection>, workers: usize) -> Self {
        Self {
            subscriber,
            projection,
            workers: workers.max(1),
        }
    }

    /// Spawns the worker tasks. Abort the handles to stop ingestion.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        (0..self.workers)
            .map(|worker| {
                let subscriber = Arc::clone(&self.subscriber);
                let projection = Arc::clone(&self.projection);
                tokio::spawn(async move {
                    loop {
                        let mut stream = match subscriber.subscribe(PURCHASE_RESULT_TOPIC).await {
                            Ok(stream) => stream,
                            Err(error) => {
                                tracing::warn!(worker, %error, "result subscription failed, retrying");
                                tokio::time::sleep(RESUBSCRIBE_BACKOFF).await;
                                continue;
                            }
                        };
                        tracing::info!(worker, topic = PURCHASE_RESULT_TOPIC, "result worker subscribed");

                        while let Some(item) = stream.next().await {
                            match item {
                                Ok(delivery) => match projection.apply(&delivery.message).await {
                                    Ok(()) => delivery.ack(),
                                    Err(error) => {
                                        tracing::error!(worker, %error, "failed to apply result, resubscribing for redelivery");
                                        break;
                                    }
                                },
                                Err(error) => {
                                    tracing::warn!(worker, %error, "result stream error");
                                    break;
                                }
                            }
                        }

                        tracing::warn!(worker, "result stream ended, resubscribing");
                        tokio::time::sleep(RESUBSCRIBE_BACKOFF).await;
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ResultCache, ResultStore};
    use crate::error::ProjectionError;
    use crate::feed::ResultFeed;
    use common::CustomerId;
    use domain::{PurchaseResult, PurchaseStatus};
    use messaging::{InMemoryEventBus, Message, Publisher};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Store double whose writes fail on demand.
    #[derive(Default)]
    struct FlakyStore {
        inner: ResultCache,
        fail_writes: AtomicBool,
        attempts: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ResultStore for FlakyStore {
        async fn set(
            &self,
            customer_id: CustomerId,
            result: PurchaseResult,
        ) -> Result<(), ProjectionError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(ProjectionError::CacheWrite("store offline".to_string()));
            }
            self.inner.set(customer_id, result).await
        }
    }

    #[tokio::test]
    async fn ingests_published_results_into_the_cache() {
        let bus = Arc::new(InMemoryEventBus::new());
        let cache = Arc::new(ResultCache::new());
        let feed = ResultFeed::new();
        let projection = Arc::new(ResultProjection::new(
            Arc::clone(&cache) as Arc<dyn ResultStore>,
            feed.clone(),
        ));

        let ingestor = ResultIngestor::new(Arc::clone(&bus), projection, 1);
        let handles = ingestor.spawn();

        // Wait for the worker's subscription before publishing.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut listener = feed.attach(CustomerId::new(7));

        bus.publish(
            PURCHASE_RESULT_TOPIC,
            Message::new(br#"{"customer_id":7,"purchase_id":1,"step":1,"status":1}"#.to_vec()),
        )
        .await
        .unwrap();

        let delivered = listener.recv().await.unwrap();
        assert_eq!(delivered.status, PurchaseStatus::Success);
        assert_eq!(
            cache.get(CustomerId::new(7)).await.map(|r| r.status),
            Some(PurchaseStatus::Success)
        );
        assert_eq!(bus.acked_count(), 1);

        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_store_write_is_not_acknowledged_and_recovers_on_redelivery() {
        let bus = Arc::new(InMemoryEventBus::new());
        let store = Arc::new(FlakyStore::default());
        store.fail_writes.store(true, Ordering::SeqCst);
        let feed = ResultFeed::new();
        let projection = Arc::new(ResultProjection::new(
            Arc::clone(&store) as Arc<dyn ResultStore>,
            feed.clone(),
        ));

        let handles = ResultIngestor::new(Arc::clone(&bus), projection, 1).spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let payload = br#"{"customer_id":3,"purchase_id":2,"step":1,"status":1}"#.to_vec();
        bus.publish(PURCHASE_RESULT_TOPIC, Message::new(payload.clone()))
            .await
            .unwrap();

        // The write fails, so the delivery must stay unacknowledged.
        while store.attempts.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(bus.acked_count(), 0);

        // Once the store recovers, a redelivered event lands and is
        // acknowledged. The broadcast bus keeps no offsets, so the test
        // stands in for the broker by republishing until the worker's
        // fresh subscription picks the event up.
        store.fail_writes.store(false, Ordering::SeqCst);
        while store.inner.get(CustomerId::new(3)).await.is_none() {
            bus.publish(PURCHASE_RESULT_TOPIC, Message::new(payload.clone()))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert!(bus.acked_count() >= 1);

        for handle in handles {
            handle.abort();
        }
    }
}
