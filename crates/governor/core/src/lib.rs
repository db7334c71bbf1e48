//! # governor-core
//!
//! Layered operational-safety governor. Gates high-impact control operations
//! (changes to shared, constrained resource allocations) before they take
//! effect, so that no single actor or automated loop can cause cascading or
//! irreversible change on its own.
//!
//! ## Evaluation pipeline
//!
//! `evaluate()` short-circuits on the first failure:
//!
//! 1. **Emergency stop**: denies everything while engaged
//! 2. **Validation**: empty fields or out-of-range percentages
//! 3. **Rate limiter**: sliding window per operation type
//! 4. **Quota**: hard caps on cumulative resource allocation
//! 5. **Anomaly detector**: heuristics over recent history
//! 6. **Approval**: anomalous or high-risk operations wait for multi-factor sign-off
//! 7. **Rollback**: every allowed operation is reverted unless confirmed in time
//!
//! Every step is appended to the [`AuditTrail`] before the caller sees the result.
//!
//! ## Components
//!
//! - **SafetyGovernor / PrivilegedChannel**: the entry points
//! - **AuditTrail**: bounded append-only log, also the history the other controls read
//! - **RateLimiter, ResourceQuotaManager, AnomalyDetector**: the hard checks
//! - **ApprovalWorkflow**: `PENDING → APPROVED | REJECTED`
//! - **RollbackScheduler**: `ACTIVE → CONFIRMED | EXECUTED`
//! - **EmergencyStopController**: global override with a lock-free flag
//! - **SafetyPosture**: safety level derived from recent incidents

#![deny(unsafe_code)]

pub mod anomaly;
pub mod approval;
pub mod audit;
pub mod clock;
pub mod config;
pub mod emergency;
pub mod error;
pub mod governor;
pub mod posture;
pub mod quota;
pub mod rate_limiter;
pub mod rollback;

pub use anomaly::{AnomalyDetector, AnomalyScore, AnomalyTrigger};
pub use approval::ApprovalWorkflow;
pub use audit::AuditTrail;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AnomalyConfig, ApprovalConfig, AuditConfig, GovernorConfig, QuotaConfig, RateLimitConfig,
    RollbackConfig, SafetyLevelConfig,
};
pub use emergency::{EmergencyStopController, EmergencyStopHandle, Engagement};
pub use error::{GovernorError, GovernorResult};
pub use governor::{FactorOutcome, PrivilegedChannel, SafetyGovernor, TickReport};
pub use posture::{LevelChange, SafetyPosture};
pub use quota::{QuotaCheck, ResourceQuotaManager};
pub use rate_limiter::{RateLimitCheck, RateLimiter};
pub use rollback::RollbackScheduler;

pub use governor_types::{
    ApprovalRequest, ApprovalStatus, AuditEntry, AuditEvent, Decision, DenialReason,
    EvaluationResult, EvaluationStatus, GovernorStatus, OperationRecord, OperationRequest,
    ResetRecord, ResourceUsage, RollbackStatus, RollbackTimer, SafetyLevel, StopRecord,
};
