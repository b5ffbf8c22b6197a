//! Purchase result event produced by the saga orchestrator.

use serde::{Deserialize, Serialize};

/// The saga step a result event refers to.
///
/// `Unknown` captures step codes introduced by newer orchestrator
/// revisions; decoding never fails on them, so consumers can tell
/// "no result yet" apart from "result with an unrecognized step".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStep {
    /// Product inventory was being updated.
    UpdateInventory,
    /// The order record was being created.
    CreateOrder,
    /// The payment was being created.
    CreatePayment,
    /// A step code this gateway does not recognize.
    Unknown,
}

impl std::fmt::Display for PurchaseStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PurchaseStep::UpdateInventory => "update_inventory",
            PurchaseStep::CreateOrder => "create_order",
            PurchaseStep::CreatePayment => "create_payment",
            PurchaseStep::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Outcome of a saga step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// The step is still executing.
    Executing,
    /// The step completed successfully.
    Success,
    /// The step failed; compensation may follow.
    Failed,
    /// The step was compensated.
    RolledBack,
    /// Compensation itself failed.
    RollbackFailed,
    /// A status code this gateway does not recognize.
    Unknown,
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PurchaseStatus::Executing => "executing",
            PurchaseStatus::Success => "success",
            PurchaseStatus::Failed => "failed",
            PurchaseStatus::RolledBack => "rolled_back",
            PurchaseStatus::RollbackFailed => "rollback_failed",
            PurchaseStatus::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Latest known progress of a customer's purchase.
///
/// Produced externally and delivered at least once; a newer result for
/// the same customer simply overwrites the previous one — no history is
/// retained and no monotonic step progression may be assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseResult {
    /// Purchase identifier, absent on older protocol revisions.
    pub purchase_id: Option<u64>,
    /// The saga step this result refers to.
    pub step: PurchaseStep,
    /// Outcome of that step.
    pub status: PurchaseStatus,
}
