//! Multi-factor approval request state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lifecycle of an approval request. `Approved` and `Rejected` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApprovalStatus::Approved | ApprovalStatus::Rejected)
    }
}

/// A high-risk operation waiting on independent sign-off factors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    /// Operation id the approval gates.
    pub operation_id: String,
    /// Operation type the approval gates.
    pub operation: String,
    pub origin: String,
    pub status: ApprovalStatus,
    /// Factor name → satisfied.
    pub factors: BTreeMap<String, bool>,
    pub approvals_received: u32,
    pub approvals_required: u32,
    pub created_at: i64,
    pub timeout_ms: i64,
}

impl ApprovalRequest {
    /// Deadline after which a pending request is stale.
    pub fn expires_at(&self) -> i64 {
        self.created_at.saturating_add(self.timeout_ms)
    }

    /// A pending request is expired once `now` passes its deadline.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.status == ApprovalStatus::Pending && now_ms > self.expires_at()
    }

    /// Status as a reader should interpret it: expired pending requests read as rejected.
    pub fn effective_status(&self, now_ms: i64) -> ApprovalStatus {
        if self.is_expired(now_ms) {
            ApprovalStatus::Rejected
        } else {
            self.status
        }
    }

    /// Whether every factor is satisfied.
    pub fn all_factors_satisfied(&self) -> bool {
        self.factors.values().all(|ok| *ok)
    }

    /// Names of factors still outstanding.
    pub fn outstanding_factors(&self) -> Vec<&str> {
        self.factors
            .iter()
            .filter(|(_, ok)| !**ok)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
