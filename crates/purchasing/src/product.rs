//! Catalog-validation repository.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use common::ProductId;
use domain::{CartItem, ProductCondition, ProductStatus};
use resilience::{CallRequest, ResilientClient, Transport, TransportError};
use serde::{Deserialize, Serialize};

use crate::error::PurchaseError;

const PRODUCT_SERVICE: &str = "product.ProductService";
const CHECK_METHOD: &str = "CheckProducts";

// Catalog wire status codes.
const WIRE_STATUS_OK: i32 = 0;
const WIRE_STATUS_NOT_FOUND: i32 = 1;

/// Validates cart items against the catalog and fetches unit prices.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Checks every cart item; the returned statuses are order-aligned
    /// with the request.
    async fn check_products(
        &self,
        cart_items: &[CartItem],
    ) -> Result<Vec<ProductStatus>, PurchaseError>;
}

#[derive(Serialize)]
struct CheckProductsRequest<'a> {
    cart_items: &'a [CartItem],
}

#[derive(Deserialize)]
struct WireProductStatus {
    product_id: u64,
    price: i64,
    status: i32,
}

#[derive(Deserialize)]
struct CheckProductsResponse {
    product_statuses: Vec<WireProductStatus>,
}

/// Production implementation calling the catalog service through the
/// resilient client.
pub struct RemoteProductRepository<T: Transport> {
    client: ResilientClient<T>,
}

impl<T: Transport> RemoteProductRepository<T> {
    /// Wraps a resilient client connected to the catalog service.
    pub fn new(client: ResilientClient<T>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<T: Transport> ProductRepository for RemoteProductRepository<T> {
    async fn check_products(
        &self,
        cart_items: &[CartItem],
    ) -> Result<Vec<ProductStatus>, PurchaseError> {
        let payload = serde_json::to_vec(&CheckProductsRequest { cart_items })?;
        let response = self
            .client
            .call(CallRequest::new(PRODUCT_SERVICE, CHECK_METHOD, payload))
            .await?;
        let decoded: CheckProductsResponse = serde_json::from_slice(&response.payload)?;

        Ok(decoded
            .product_statuses
            .into_iter()
            .map(|status| ProductStatus {
                product_id: ProductId::new(status.product_id),
                unit_price: status.price,
                status: match status.status {
                    WIRE_STATUS_OK => ProductCondition::Ok,
                    WIRE_STATUS_NOT_FOUND => ProductCondition::NotFound,
                    _ => ProductCondition::Unknown,
                },
            })
            .collect())
    }
}

/// Test double backed by a fixed catalog.
#[derive(Default)]
pub struct InMemoryProductRepository {
    catalog: RwLock<HashMap<ProductId, i64>>,
    calls: AtomicU32,
    unavailable: AtomicBool,
}

impl InMemoryProductRepository {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product with its unit price.
    pub fn insert_product(&self, product_id: ProductId, unit_price: i64) {
        self.catalog
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(product_id, unit_price);
    }

    /// Makes subsequent calls fail as if the service were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of catalog checks performed.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn check_products(
        &self,
        cart_items: &[CartItem],
    ) -> Result<Vec<ProductStatus>, PurchaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PurchaseError::Remote(
                TransportError::Unavailable("product service down".to_string()).into(),
            ));
        }
        let catalog = self.catalog.read().unwrap_or_else(|e| e.into_inner());
        Ok(cart_items
            .iter()
            .map(|item| match catalog.get(&item.product_id) {
                Some(&price) => ProductStatus {
                    product_id: item.product_id,
                    unit_price: price,
                    status: ProductCondition::Ok,
                },
                None => ProductStatus {
                    product_id: item.product_id,
                    unit_price: 0,
                    status: ProductCondition::NotFound,
                },
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn statuses_align_with_request_order() {
        let repo = InMemoryProductRepository::new();
        repo.insert_product(ProductId::new(2), 250);
        repo.insert_product(ProductId::new(1), 100);

        let items = [
            CartItem::new(ProductId::new(2), 1),
            CartItem::new(ProductId::new(1), 4),
        ];
        let statuses = repo.check_products(&items).await.unwrap();

        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].product_id, ProductId::new(2));
        assert_eq!(statuses[0].unit_price, 250);
        assert_eq!(statuses[1].product_id, ProductId::new(1));
        assert_eq!(statuses[1].unit_price, 100);
    }

    #[tokio::test]
    async fn missing_products_report_not_found() {
        let repo = InMemoryProductRepository::new();
        let items = [CartItem::new(ProductId::new(9), 1)];

        let statuses = repo.check_products(&items).await.unwrap();
        assert_eq!(statuses[0].status, ProductCondition::NotFound);
    }
}
