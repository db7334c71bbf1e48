//! Audit trail entry types.

use serde::{Deserialize, Serialize};

use crate::approval::{ApprovalRequest, ApprovalStatus};
use crate::operation::{Decision, OperationRecord};
use crate::rollback::RollbackTimer;
use crate::safety::SafetyLevel;

/// An entry in the audit trail: an event plus the metadata assigned on append.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Monotonic sequence number, never reused even after eviction.
    pub sequence: u64,
    pub recorded_at_ms: i64,
    pub event: AuditEvent,
}

impl AuditEntry {
    /// The operation record, if this entry is an evaluation.
    pub fn operation(&self) -> Option<&OperationRecord> {
        match &self.event {
            AuditEvent::OperationEvaluated(record) => Some(record),
            _ => None,
        }
    }
}

/// Every governor decision and state change that is written to the trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    OperationEvaluated(OperationRecord),
    ApprovalRequested(ApprovalRequest),
    FactorSubmitted {
        approval_id: String,
        factor: String,
        approved: bool,
        authorized_by: String,
        status: ApprovalStatus,
    },
    /// A privileged call that failed (unknown id, expired request, ...).
    PrivilegedCallFailed {
        action: String,
        authorized_by: String,
        error: String,
    },
    /// Terminal outcome of an approval and what happened to its operation.
    ApprovalResolved {
        approval_id: String,
        operation_id: String,
        status: ApprovalStatus,
        outcome: Decision,
        reason: String,
    },
    RollbackArmed(RollbackTimer),
    RollbackConfirmed(RollbackTimer),
    /// Confirmation of an operation with no active timer.
    ConfirmFailed {
        operation_id: String,
        error: String,
    },
    RollbackExecuted {
        timer: RollbackTimer,
        /// True when forced by the emergency stop rather than by expiry.
        forced: bool,
    },
    EmergencyStopEngaged {
        reason: String,
        authorized_by: String,
        already_engaged: bool,
    },
    Reset {
        authorized_by: String,
        previous_level: SafetyLevel,
        discarded_approvals: usize,
        discarded_rollbacks: usize,
    },
    SafetyLevelChanged {
        from: SafetyLevel,
        to: SafetyLevel,
        incidents: usize,
    },
    Shutdown,
}

impl AuditEvent {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuditEvent::OperationEvaluated(_) => "operation_evaluated",
            AuditEvent::ApprovalRequested(_) => "approval_requested",
            AuditEvent::FactorSubmitted { .. } => "factor_submitted",
            AuditEvent::PrivilegedCallFailed { .. } => "privileged_call_failed",
            AuditEvent::ApprovalResolved { .. } => "approval_resolved",
            AuditEvent::RollbackArmed(_) => "rollback_armed",
            AuditEvent::RollbackConfirmed(_) => "rollback_confirmed",
            AuditEvent::ConfirmFailed { .. } => "confirm_failed",
            AuditEvent::RollbackExecuted { .. } => "rollback_executed",
            AuditEvent::EmergencyStopEngaged { .. } => "emergency_stop_engaged",
            AuditEvent::Reset { .. } => "reset",
            AuditEvent::SafetyLevelChanged { .. } => "safety_level_changed",
            AuditEvent::Shutdown => "shutdown",
        }
    }
}
