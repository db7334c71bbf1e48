//! # governor-types
//!
//! Shared data model for the operational-safety governor.
//!
//! Every value in this crate is plain data: callers of the governor only
//! ever receive clones of these types, never references into governor state.
//!
//! ## Types
//!
//! - **OperationRequest / OperationRecord**: what a caller submits and what
//!   the audit trail keeps for every evaluation
//! - **EvaluationResult / DenialReason**: the synchronous verdict
//! - **ApprovalRequest / ApprovalStatus**: multi-factor sign-off state
//! - **RollbackTimer / RollbackStatus**: time-bound automatic reversal
//! - **SafetyLevel**: the governor's overall posture
//! - **AuditEntry / AuditEvent**: the append-only decision log
//! - **GovernorStatus / StopRecord / ResetRecord**: polling and privileged replies

#![deny(unsafe_code)]

pub mod approval;
pub mod audit;
pub mod operation;
pub mod rollback;
pub mod safety;
pub mod status;

pub use approval::{ApprovalRequest, ApprovalStatus};
pub use audit::{AuditEntry, AuditEvent};
pub use operation::{
    Decision, DenialReason, EvaluationResult, EvaluationStatus, OperationRecord, OperationRequest,
};
pub use rollback::{RollbackStatus, RollbackTimer};
pub use safety::SafetyLevel;
pub use status::{GovernorStatus, ResetRecord, ResourceUsage, StopRecord};
