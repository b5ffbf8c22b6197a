//! Per-customer result cache with a sliding time-to-live.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use common::CustomerId;
use domain::PurchaseResult;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::ProjectionError;

/// Default retention for a customer's latest result.
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(600);

/// Write side of the result store, as seen by the projection.
///
/// A failed write must surface as an error so the delivery stays
/// unacknowledged and comes back; swallowing it would lose the result.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Stores a customer's latest result.
    async fn set(
        &self,
        customer_id: CustomerId,
        result: PurchaseResult,
    ) -> Result<(), ProjectionError>;
}

struct Entry {
    result: PurchaseResult,
    expires_at: Instant,
}

/// Holds the latest known result per customer.
///
/// Last write wins: a newer result for the same customer overwrites the
/// previous one, and re-applying the same result is a no-op in effect.
/// Each write restarts the entry's time-to-live; entries are evicted
/// lazily on read.
pub struct ResultCache {
    entries: RwLock<HashMap<CustomerId, Entry>>,
    ttl: Duration,
}

impl ResultCache {
    /// Creates a cache with the default time-to-live.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_RESULT_TTL)
    }

    /// Creates a cache retaining entries for `ttl` after their last write.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Stores a customer's latest result, restarting its expiry.
    pub async fn set(
        &self,
        customer_id: CustomerId,
        result: PurchaseResult,
    ) -> Result<(), ProjectionError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            customer_id,
            Entry {
                result,
                expires_at: Instant::now() + self.ttl,
            },
        );
        metrics::gauge!("purchase_results_cached").set(entries.len() as f64);
        Ok(())
    }

    /// Returns the customer's latest unexpired result, if any.
    pub async fn get(&self, customer_id: CustomerId) -> Option<PurchaseResult> {
        {
            let entries = self.entries.read().await;
            match entries.get(&customer_id) {
                Some(entry) if entry.expires_at > Instant::now() => return Some(entry.result),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: upgrade to a write lock and drop the entry.
        let mut entries = self.entries.write().await;
        if entries
            .get(&customer_id)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(&customer_id);
        }
        None
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultStore for ResultCache {
    async fn set(
        &self,
        customer_id: CustomerId,
        result: PurchaseResult,
    ) -> Result<(), ProjectionError> {
        ResultCache::set(self, customer_id, result).await
    }
}
