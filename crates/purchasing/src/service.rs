//! Purchasing service: validation, pricing, and command publication.

use std::sync::Arc;

use common::{CorrelationId, CustomerId};
use domain::{CartItem, ProductCondition, ProductStatus, Purchase};

use crate::error::PurchaseError;
use crate::product::ProductRepository;
use crate::publisher::PurchasingRepository;

/// Front door of the purchase command path.
///
/// Validation order matters: cart amounts are checked before any
/// network call, then every item must pass the catalog check before a
/// purchase is assembled and published.
pub struct PurchasingService {
    product_repo: Arc<dyn ProductRepository>,
    purchasing_repo: Arc<dyn PurchasingRepository>,
}

impl PurchasingService {
    /// Creates the service over its repository seams.
    pub fn new(
        product_repo: Arc<dyn ProductRepository>,
        purchasing_repo: Arc<dyn PurchasingRepository>,
    ) -> Self {
        Self {
            product_repo,
            purchasing_repo,
        }
    }

    /// Checks cart items against the catalog.
    ///
    /// Rejects non-positive amounts before contacting the network; a
    /// single missing or unrecognized product fails the whole check.
    #[tracing::instrument(skip(self, cart_items), fields(items = cart_items.len()))]
    pub async fn check_products(
        &self,
        cart_items: &[CartItem],
    ) -> Result<Vec<ProductStatus>, PurchaseError> {
        if cart_items.iter().any(|item| !item.has_valid_amount()) {
            return Err(PurchaseError::InvalidCartItemAmount);
        }

        let statuses = self.product_repo.check_products(cart_items).await?;
        for status in &statuses {
            match status.status {
                ProductCondition::Ok => {}
                ProductCondition::NotFound => return Err(PurchaseError::ProductNotFound),
                ProductCondition::Unknown => return Err(PurchaseError::UnknownProductStatus),
            }
        }
        Ok(statuses)
    }

    /// Validates a cart and publishes the purchase command.
    ///
    /// Returns the correlation identifier assigned to the published
    /// command.
    #[tracing::instrument(skip(self, cart_items), fields(%customer_id))]
    pub async fn create_purchase(
        &self,
        customer_id: CustomerId,
        cart_items: Vec<CartItem>,
        currency_code: String,
    ) -> Result<CorrelationId, PurchaseError> {
        let statuses = self.check_products(&cart_items).await?;

        let purchase = Purchase::from_validated(customer_id, cart_items, &statuses, currency_code);
        self.purchasing_repo.create_purchase(&purchase).await
    }
}
