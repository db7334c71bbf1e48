use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RollbackStatus {
    Active,
    Confirmed,
    Executed,
}

/// Deadline after which an approved but unconfirmed operation is reverted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RollbackTimer {
    /// Timer key. Distinct per `arm` call, even for the same operation.
    pub id: String,
    pub operation_id: String,
    pub operation_type: String,
    pub status: RollbackStatus,
    pub created_at: i64,
    pub expiry_at: i64,
    pub confirmed: bool,
    /// Quota key reserved by the operation, released when the rollback executes.
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub resource_pct: f64,
}

impl RollbackTimer {
    pub fn is_active(&self) -> bool {
        self.status == RollbackStatus::Active
    }

    /// Whether the deadline has been reached at `now_ms`.
    pub fn is_due(&self, now_ms: i64) -> bool {
        self.is_active() && self.expiry_at <= now_ms
    }

    /// Milliseconds left before the deadline (zero once due).
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        (self.expiry_at - now_ms).max(0)
    }
}
