//! Serialized layouts used on the event stream.
//!
//! The command schema is what the saga orchestrator consumes; the result
//! schema is what it produces. Step and status travel as compact integer
//! codes and are decoded leniently: codes this gateway does not know map
//! to the explicit `Unknown` variants instead of failing, so a newer
//! orchestrator never breaks older consumers.

use chrono::{DateTime, Utc};
use common::CustomerId;
use serde::{Deserialize, Serialize};

use crate::model::Purchase;
use crate::result::{PurchaseResult, PurchaseStatus, PurchaseStep};

/// One purchased item inside the command payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasedItem {
    pub product_id: u64,
    pub amount: i64,
}

/// Order section of the command payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireOrder {
    pub customer_id: u64,
    pub purchased_items: Vec<PurchasedItem>,
}

/// Payment section of the command payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePayment {
    pub currency_code: String,
    pub amount: i64,
}

/// Purchase section of the command payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePurchase {
    pub order: WireOrder,
    pub payment: WirePayment,
}

/// The `CreatePurchase` command published to the `purchase` topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseCommand {
    pub purchase: WirePurchase,
    /// Captured at publish time.
    pub timestamp: DateTime<Utc>,
}

impl CreatePurchaseCommand {
    /// Flattens a validated purchase into the wire schema.
    pub fn from_purchase(purchase: &Purchase, timestamp: DateTime<Utc>) -> Self {
        Self {
            purchase: WirePurchase {
                order: WireOrder {
                    customer_id: purchase.order.customer_id.as_u64(),
                    purchased_items: purchase
                        .order
                        .cart_items
                        .iter()
                        .map(|item| PurchasedItem {
                            product_id: item.product_id.as_u64(),
                            amount: item.amount,
                        })
                        .collect(),
                },
                payment: WirePayment {
                    currency_code: purchase.payment.currency_code.clone(),
                    amount: purchase.payment.amount,
                },
            },
            timestamp,
        }
    }
}

// Step codes on the wire.
const STEP_UPDATE_INVENTORY: i32 = 0;
const STEP_CREATE_ORDER: i32 = 1;
const STEP_CREATE_PAYMENT: i32 = 2;

// Status codes on the wire.
const STATUS_EXECUTING: i32 = 0;
const STATUS_SUCCESS: i32 = 1;
const STATUS_FAILED: i32 = 2;
const STATUS_ROLLED_BACK: i32 = 3;
const STATUS_ROLLBACK_FAILED: i32 = 4;

/// A result event as it appears on the `purchase.result` topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseResultMessage {
    pub customer_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_id: Option<u64>,
    pub step: i32,
    pub status: i32,
}

impl PurchaseResultMessage {
    /// Decodes the compact step code. Unrecognized codes map to
    /// [`PurchaseStep::Unknown`].
    pub fn decode_step(&self) -> PurchaseStep {
        match self.step {
            STEP_UPDATE_INVENTORY => PurchaseStep::UpdateInventory,
            STEP_CREATE_ORDER => PurchaseStep::CreateOrder,
            STEP_CREATE_PAYMENT => PurchaseStep::CreatePayment,
            _ => PurchaseStep::Unknown,
        }
    }

    /// Decodes the compact status code. Unrecognized codes map to
    /// [`PurchaseStatus::Unknown`].
    pub fn decode_status(&self) -> PurchaseStatus {
        match self.status {
            STATUS_EXECUTING => PurchaseStatus::Executing,
            STATUS_SUCCESS => PurchaseStatus::Success,
            STATUS_FAILED => PurchaseStatus::Failed,
            STATUS_ROLLED_BACK => PurchaseStatus::RolledBack,
            STATUS_ROLLBACK_FAILED => PurchaseStatus::RollbackFailed,
            _ => PurchaseStatus::Unknown,
        }
    }

    /// Converts the wire message into the internal result event plus the
    /// customer identity used for routing.
    pub fn into_result(self) -> (CustomerId, PurchaseResult) {
        let step = self.decode_step();
        let status = self.decode_status();
        (
            CustomerId::new(self.customer_id),
            PurchaseResult {
                purchase_id: self.purchase_id,
                step,
                status,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CartItem, ProductCondition, ProductStatus};
    use common::ProductId;

    #[test]
    fn command_flattens_cart_items() {
        let items = vec![CartItem::new(ProductId::new(7), 2)];
        let statuses = [ProductStatus {
            product_id: ProductId::new(7),
            unit_price: 50,
            status: ProductCondition::Ok,
        }];
        let purchase =
            Purchase::from_validated(CustomerId::new(1), items, &statuses, "NT".to_string());

        let cmd = CreatePurchaseCommand::from_purchase(&purchase, Utc::now());

        assert_eq!(cmd.purchase.order.customer_id, 1);
        assert_eq!(cmd.purchase.order.purchased_items.len(), 1);
        assert_eq!(cmd.purchase.order.purchased_items[0].product_id, 7);
        assert_eq!(cmd.purchase.order.purchased_items[0].amount, 2);
        assert_eq!(cmd.purchase.payment.amount, 100);
        assert_eq!(cmd.purchase.payment.currency_code, "NT");
    }

    #[test]
    fn known_codes_decode() {
        let msg = PurchaseResultMessage {
            customer_id: 1,
            purchase_id: Some(10),
            step: STEP_CREATE_ORDER,
            status: STATUS_SUCCESS,
        };
        let (customer, result) = msg.into_result();
        assert_eq!(customer, CustomerId::new(1));
        assert_eq!(result.purchase_id, Some(10));
        assert_eq!(result.step, PurchaseStep::CreateOrder);
        assert_eq!(result.status, PurchaseStatus::Success);
    }

    #[test]
    fn unknown_codes_decode_leniently() {
        let msg = PurchaseResultMessage {
            customer_id: 1,
            purchase_id: None,
            step: 99,
            status: -1,
        };
        let (_, result) = msg.into_result();
        assert_eq!(result.step, PurchaseStep::Unknown);
        assert_eq!(result.status, PurchaseStatus::Unknown);
    }

    #[test]
    fn missing_purchase_id_is_accepted() {
        let json = r#"{"customer_id":4,"step":1,"status":0}"#;
        let msg: PurchaseResultMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.purchase_id, None);
        assert_eq!(msg.decode_step(), PurchaseStep::CreateOrder);
    }
}
