//! Entities and value objects for the purchase command path.

use common::{CustomerId, ProductId};
use serde::{Deserialize, Serialize};

/// A single line of a customer's cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// The product being purchased.
    pub product_id: ProductId,
    /// Requested quantity. Must be positive; requests carrying a
    /// non-positive amount are rejected before any downstream call.
    pub amount: i64,
}

impl CartItem {
    /// Creates a new cart item.
    pub fn new(product_id: ProductId, amount: i64) -> Self {
        Self { product_id, amount }
    }

    /// Returns true if the requested amount is positive.
    pub fn has_valid_amount(&self) -> bool {
        self.amount > 0
    }
}

/// Availability of a product as reported by the catalog service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCondition {
    /// Product exists and can be purchased.
    Ok,
    /// Product is not known to the catalog.
    NotFound,
    /// The catalog reported a status code this gateway does not recognize.
    Unknown,
}

/// Per-item validation outcome from the catalog check, order-aligned
/// with the requested cart items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStatus {
    /// The product this status refers to.
    pub product_id: ProductId,
    /// Unit price in the smallest currency denomination.
    pub unit_price: i64,
    /// Availability of the product.
    pub status: ProductCondition,
}

/// The order half of a purchase: who buys what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// The purchasing customer.
    pub customer_id: CustomerId,
    /// Validated cart items, in request order.
    pub cart_items: Vec<CartItem>,
}

/// The payment half of a purchase: currency and derived total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// ISO currency code, e.g. `"NT"` or `"USD"`.
    pub currency_code: String,
    /// Total amount: Σ (item amount × matching unit price).
    pub amount: i64,
}

/// Validated purchase aggregate.
///
/// Constructed only after every cart item passed the catalog check;
/// immutable afterwards and owned by the command publisher for the
/// duration of one publish call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Who buys what.
    pub order: Order,
    /// How it is paid.
    pub payment: Payment,
}

impl Purchase {
    /// Assembles a purchase from validated cart items and their
    /// order-aligned product statuses.
    pub fn from_validated(
        customer_id: CustomerId,
        cart_items: Vec<CartItem>,
        statuses: &[ProductStatus],
        currency_code: String,
    ) -> Self {
        let amount = cart_items
            .iter()
            .zip(statuses)
            .map(|(item, status)| item.amount * status.unit_price)
            .sum();
        Self {
            order: Order {
                customer_id,
                cart_items,
            },
            payment: Payment {
                currency_code,
                amount,
            },
        }
    }
}

/// Outcome of verifying an access token with the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    /// Customer the token belongs to.
    pub customer_id: CustomerId,
    /// Whether the token is active.
    pub active: bool,
    /// Whether the token has expired.
    pub expired: bool,
}

impl AuthResult {
    /// Returns true if the token authenticates a customer.
    pub fn is_authenticated(&self) -> bool {
        self.active && !self.expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(product_id: u64, unit_price: i64) -> ProductStatus {
        ProductStatus {
            product_id: ProductId::new(product_id),
            unit_price,
            status: ProductCondition::Ok,
        }
    }

    #[test]
    fn cart_item_amount_validation() {
        assert!(CartItem::new(ProductId::new(1), 3).has_valid_amount());
        assert!(!CartItem::new(ProductId::new(1), 0).has_valid_amount());
        assert!(!CartItem::new(ProductId::new(1), -2).has_valid_amount());
    }

    #[test]
    fn purchase_total_is_sum_of_aligned_products() {
        let items = vec![
            CartItem::new(ProductId::new(1), 3),
            CartItem::new(ProductId::new(2), 2),
        ];
        let statuses = [status(1, 100), status(2, 250)];

        let purchase = Purchase::from_validated(
            CustomerId::new(9),
            items,
            &statuses,
            "USD".to_string(),
        );

        assert_eq!(purchase.payment.amount, 3 * 100 + 2 * 250);
        assert_eq!(purchase.order.customer_id, CustomerId::new(9));
        assert_eq!(purchase.order.cart_items.len(), 2);
    }

    #[test]
    fn single_item_total() {
        let items = vec![CartItem::new(ProductId::new(1), 3)];
        let statuses = [status(1, 100)];

        let purchase =
            Purchase::from_validated(CustomerId::new(1), items, &statuses, "NT".to_string());

        assert_eq!(purchase.payment.amount, 300);
    }

    #[test]
    fn auth_result_authentication() {
        let ok = AuthResult {
            customer_id: CustomerId::new(1),
            active: true,
            expired: false,
        };
        assert!(ok.is_authenticated());

        let expired = AuthResult {
            expired: true,
            ..ok
        };
        assert!(!expired.is_authenticated());

        let inactive = AuthResult {
            active: false,
            ..ok
        };
        assert!(!inactive.is_authenticated());
    }
}
