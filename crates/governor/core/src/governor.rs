//! The safety governor: single entry point composing every control.
//!
//! All mutable state sits in one [`GovernorState`] behind a single
//! `parking_lot::Mutex`, so every call is serialized and each decision sees
//! (and appends to) a consistent audit trail. The emergency-stop flag is the
//! one exception: it is an atomic shared with the state so a stop can be
//! raised before the lock is acquired, and every side effect re-checks it
//! immediately before committing.
//!
//! Privileged actions (approval factors, emergency stop, reset) are only
//! reachable through the [`PrivilegedChannel`] returned by
//! [`SafetyGovernor::new`], never through the governor handle itself.

use std::collections::HashMap;
use std::sync::Arc;

use governor_types::{
    ApprovalRequest, ApprovalStatus, AuditEntry, AuditEvent, Decision, DenialReason,
    EvaluationResult, GovernorStatus, OperationRecord, OperationRequest, ResetRecord,
    RollbackTimer, SafetyLevel, StopRecord,
};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::anomaly::{AnomalyDetector, AnomalyScore};
use crate::approval::ApprovalWorkflow;
use crate::audit::AuditTrail;
use crate::clock::{Clock, SystemClock};
use crate::config::GovernorConfig;
use crate::emergency::{EmergencyStopController, EmergencyStopHandle};
use crate::error::{GovernorError, GovernorResult};
use crate::posture::{LevelChange, SafetyPosture};
use crate::quota::ResourceQuotaManager;
use crate::rate_limiter::RateLimiter;
use crate::rollback::RollbackScheduler;

// ── Public results ──────────────────────────────────────────────────────

/// Reply to a factor submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FactorOutcome {
    /// The approval request after the factor was applied.
    pub request: ApprovalRequest,
    /// Final verdict for the gated operation, once the approval resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationResult>,
}

/// What one `tick` did.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub executed: Vec<RollbackTimer>,
    pub expired_approvals: usize,
    pub level_change: Option<LevelChange>,
    pub safety_level: SafetyLevel,
}

// ── Handles ─────────────────────────────────────────────────────────────

struct Shared {
    state: Mutex<GovernorState>,
    stop: EmergencyStopHandle,
    clock: Arc<dyn Clock>,
}

/// Gate for high-impact operations. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SafetyGovernor {
    shared: Arc<Shared>,
}

/// Human-only authority over a governor.
#[derive(Clone)]
pub struct PrivilegedChannel {
    shared: Arc<Shared>,
}

impl SafetyGovernor {
    /// Create a governor on the wall clock, plus its privileged channel.
    pub fn new(config: GovernorConfig) -> (Self, PrivilegedChannel) {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: GovernorConfig, clock: Arc<dyn Clock>) -> (Self, PrivilegedChannel) {
        let state = GovernorState::new(config);
        let shared = Arc::new(Shared {
            stop: state.emergency.handle(),
            state: Mutex::new(state),
            clock,
        });
        (
            Self {
                shared: shared.clone(),
            },
            PrivilegedChannel { shared },
        )
    }

    /// Run every control against `request` and return the verdict.
    ///
    /// Policy denials are results, not errors. The evaluation is in the
    /// audit trail before this returns.
    pub fn evaluate(&self, request: OperationRequest) -> EvaluationResult {
        let operation_id = format!("op-{}", Uuid::new_v4());
        let mut state = self.shared.state.lock();
        let now = self.shared.clock.now_ms();
        state.evaluate(operation_id, &request, now)
    }

    /// Confirm an allowed operation so its rollback never fires.
    pub fn confirm(&self, operation_id: &str) -> GovernorResult<RollbackTimer> {
        let mut state = self.shared.state.lock();
        let now = self.shared.clock.now_ms();
        state.confirm(operation_id, now)
    }

    /// Sweep expired rollbacks and approvals, then re-evaluate the safety level.
    pub fn tick(&self) -> TickReport {
        let mut state = self.shared.state.lock();
        let now = self.shared.clock.now_ms();
        state.tick(now)
    }

    pub fn get_status(&self) -> GovernorStatus {
        let state = self.shared.state.lock();
        let now = self.shared.clock.now_ms();
        state.status(now)
    }

    /// The last `limit` operation records, most recent last.
    pub fn get_audit_trail(&self, limit: usize) -> Vec<OperationRecord> {
        self.shared.state.lock().trail.operations(limit)
    }

    /// The last `limit` audit entries of every kind, most recent last.
    pub fn get_audit_entries(&self, limit: usize) -> Vec<AuditEntry> {
        self.shared.state.lock().trail.tail(limit)
    }

    pub fn get_approval(&self, approval_id: &str) -> GovernorResult<ApprovalRequest> {
        let state = self.shared.state.lock();
        let now = self.shared.clock.now_ms();
        state.approvals.get(approval_id, now)
    }

    pub fn active_rollbacks(&self) -> Vec<RollbackTimer> {
        self.shared.state.lock().rollbacks.active().to_vec()
    }

    /// Lock-free read of the stop flag.
    pub fn is_emergency_stopped(&self) -> bool {
        self.shared.stop.is_engaged()
    }

    /// Stop accepting operations. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.shared.state.lock();
        if state.shut_down {
            return;
        }
        let now = self.shared.clock.now_ms();
        state.shut_down = true;
        state.trail.append(now, AuditEvent::Shutdown);
        info!(
            active_rollbacks = state.rollbacks.active_count(),
            "Safety governor shut down"
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.state.lock().shut_down
    }
}

impl PrivilegedChannel {
    /// Apply one approval factor on behalf of `authorized_by`.
    ///
    /// When the factor resolves the approval, the gated operation is
    /// committed (or denied) and the verdict is returned with the request.
    pub fn submit_factor(
        &self,
        approval_id: &str,
        factor: &str,
        approved: bool,
        authorized_by: &str,
    ) -> GovernorResult<FactorOutcome> {
        let mut state = self.shared.state.lock();
        let now = self.shared.clock.now_ms();
        state.submit_factor(approval_id, factor, approved, authorized_by, now)
    }

    /// Engage the global stop. Always succeeds; re-engaging updates the reason.
    pub fn engage_emergency_stop(&self, reason: &str, authorized_by: &str) -> StopRecord {
        // Raised before waiting on the lock so in-flight evaluations see it.
        self.shared.stop.raise();
        let mut state = self.shared.state.lock();
        let now = self.shared.clock.now_ms();
        state.engage_emergency_stop(reason, authorized_by, now)
    }

    /// Clear the stop, discard pending approvals and rollback timers, and
    /// return to `OPERATIONAL`.
    pub fn reset(&self, authorized_by: &str) -> ResetRecord {
        let mut state = self.shared.state.lock();
        let now = self.shared.clock.now_ms();
        state.reset(authorized_by, now)
    }
}

// ── State ───────────────────────────────────────────────────────────────

struct GovernorState {
    config: GovernorConfig,
    trail: AuditTrail,
    rate_limiter: RateLimiter,
    quota: ResourceQuotaManager,
    anomaly: AnomalyDetector,
    approvals: ApprovalWorkflow,
    rollbacks: RollbackScheduler,
    emergency: EmergencyStopController,
    posture: SafetyPosture,
    /// Operations parked behind an open approval, keyed by approval id.
    awaiting: HashMap<String, AwaitingApproval>,
    shut_down: bool,
}

struct AwaitingApproval {
    operation_id: String,
    request: OperationRequest,
}

impl GovernorState {
    fn new(config: GovernorConfig) -> Self {
        Self {
            trail: AuditTrail::new(config.audit.max_entries)
                .retaining_accepted(config.rate_limit.window_ms),
            rate_limiter: RateLimiter::new(config.rate_limit.clone()),
            quota: ResourceQuotaManager::new(config.quota.clone()),
            anomaly: AnomalyDetector::new(config.anomaly.clone()),
            approvals: ApprovalWorkflow::new(config.approval.clone()),
            rollbacks: RollbackScheduler::new(),
            emergency: EmergencyStopController::new(),
            posture: SafetyPosture::new(config.safety_level.clone()),
            awaiting: HashMap::new(),
            shut_down: false,
            config,
        }
    }

    // ── Evaluation pipeline ─────────────────────────────────────────────

    fn evaluate(
        &mut self,
        operation_id: String,
        request: &OperationRequest,
        now: i64,
    ) -> EvaluationResult {
        let mut record = OperationRecord {
            operation_id,
            operation_type: request.operation_type.clone(),
            origin: request.origin.clone(),
            sector: request.sector.clone(),
            resource_type: request.resource_type.clone(),
            resource_request_pct: request.resource_request_pct,
            timestamp_ms: now,
            approved: false,
            decision: Decision::Denied,
            reason: String::new(),
            anomalous: false,
            approval_id: None,
            rollback_timer_id: None,
        };

        if self.shut_down {
            return self.deny(record, DenialReason::GovernorShutDown, now);
        }
        if self.emergency.is_engaged() {
            let reason = self.emergency.reason();
            return self.deny(record, DenialReason::EmergencyStop { reason }, now);
        }
        if let Err(detail) = validate(request) {
            return self.deny(record, DenialReason::MalformedRequest { detail }, now);
        }

        let rate = self.rate_limiter.allow(&request.operation_type, now, &self.trail);
        if !rate.allowed {
            let denial = self.rate_limiter.denial(&request.operation_type, &rate);
            return self.deny(record, denial, now);
        }

        if let Some(resource_type) = &request.resource_type {
            let check = self.quota.check(resource_type, request.resource_request_pct);
            if !check.allowed {
                let denial = DenialReason::QuotaExceeded {
                    resource_type: resource_type.clone(),
                    requested_pct: request.resource_request_pct,
                    available_pct: check.available_pct,
                };
                return self.deny(record, denial, now);
            }
        }

        let capped = request
            .resource_type
            .as_deref()
            .is_some_and(|r| self.quota.is_capped(r));
        let score = self.anomaly.score(request, now, &self.trail, capped);
        record.anomalous = score.is_anomalous;
        if score.is_anomalous && self.config.approval.deny_on_anomaly {
            let denial = DenialReason::AnomalyDetected {
                description: score.description,
            };
            return self.deny(record, denial, now);
        }

        if let Some(why) = self.approval_reason(request, &score) {
            let approval = self.approvals.request(
                &record.operation_id,
                &request.operation_type,
                &request.origin,
                now,
            );
            self.trail
                .append(now, AuditEvent::ApprovalRequested(approval.clone()));
            record.approval_id = Some(approval.id.clone());

            if approval.status == ApprovalStatus::Pending {
                self.awaiting.insert(
                    approval.id.clone(),
                    AwaitingApproval {
                        operation_id: record.operation_id.clone(),
                        request: request.clone(),
                    },
                );
                record.decision = Decision::Pending;
                record.reason = why.clone();
                let operation_id = record.operation_id.clone();
                self.trail.append(now, AuditEvent::OperationEvaluated(record));

                info!(
                    operation_id = %operation_id,
                    approval_id = %approval.id,
                    reason = %why,
                    "Operation pending approval"
                );
                return EvaluationResult::pending(operation_id, why, approval.id);
            }
        }

        match self.commit(&record.operation_id, request, now) {
            Ok(timer) => {
                let reason = "all checks passed".to_string();
                record.approved = true;
                record.decision = Decision::Allowed;
                record.reason = reason.clone();
                record.rollback_timer_id = Some(timer.id.clone());
                let operation_id = record.operation_id.clone();
                self.trail.append(now, AuditEvent::OperationEvaluated(record));

                info!(
                    operation_id = %operation_id,
                    operation_type = %request.operation_type,
                    timer_id = %timer.id,
                    "Operation allowed"
                );
                EvaluationResult::allowed(operation_id, reason, timer.id)
            }
            Err(denial) => self.deny(record, denial, now),
        }
    }

    /// Why `request` needs sign-off, if it does.
    fn approval_reason(&self, request: &OperationRequest, score: &AnomalyScore) -> Option<String> {
        if self.posture.level() >= SafetyLevel::Lockdown {
            return Some(format!(
                "approval required at safety level {}",
                self.posture.level()
            ));
        }
        if score.is_anomalous {
            return Some(format!("approval required: {}", score.description));
        }
        let listed = self
            .config
            .approval
            .high_risk_operation_types
            .iter()
            .any(|t| *t == request.operation_type);
        if request.high_risk || listed {
            return Some("approval required: high-risk operation".to_string());
        }
        None
    }

    /// Reserve quota and arm the rollback for an operation that may proceed.
    fn commit(
        &mut self,
        operation_id: &str,
        request: &OperationRequest,
        now: i64,
    ) -> Result<RollbackTimer, DenialReason> {
        if self.emergency.is_engaged() {
            return Err(DenialReason::EmergencyStop {
                reason: self.emergency.reason(),
            });
        }

        let mut reserved = 0.0;
        if let Some(resource_type) = &request.resource_type {
            if !self.quota.allocate(resource_type, request.resource_request_pct) {
                return Err(DenialReason::QuotaExceeded {
                    resource_type: resource_type.clone(),
                    requested_pct: request.resource_request_pct,
                    available_pct: self
                        .quota
                        .check(resource_type, request.resource_request_pct)
                        .available_pct,
                });
            }
            reserved = request.resource_request_pct;
        }

        let timer = self.rollbacks.arm_reserving(
            operation_id,
            &request.operation_type,
            self.config.rollback.timeout_minutes,
            now,
            request.resource_type.clone(),
            reserved,
        );
        self.trail.append(now, AuditEvent::RollbackArmed(timer.clone()));
        Ok(timer)
    }

    fn deny(
        &mut self,
        mut record: OperationRecord,
        denial: DenialReason,
        now: i64,
    ) -> EvaluationResult {
        record.approved = false;
        record.decision = Decision::Denied;
        record.reason = denial.to_string();
        let operation_id = record.operation_id.clone();

        warn!(
            operation_id = %operation_id,
            operation_type = %record.operation_type,
            origin = %record.origin,
            denial = denial.label(),
            reason = %record.reason,
            "Operation denied"
        );

        self.trail.append(now, AuditEvent::OperationEvaluated(record));
        EvaluationResult::denied(operation_id, denial)
    }

    // ── Rollbacks ───────────────────────────────────────────────────────

    fn confirm(&mut self, operation_id: &str, now: i64) -> GovernorResult<RollbackTimer> {
        let confirmed = if self.shut_down {
            Err(GovernorError::ShutDown)
        } else if self.emergency.is_engaged() {
            Err(GovernorError::EmergencyStopEngaged(self.emergency.reason()))
        } else {
            self.rollbacks.confirm(operation_id, now)
        };

        match confirmed {
            Ok(timer) => {
                info!(operation_id = operation_id, timer_id = %timer.id, "Operation confirmed");
                self.trail
                    .append(now, AuditEvent::RollbackConfirmed(timer.clone()));
                Ok(timer)
            }
            Err(err) => {
                warn!(operation_id = operation_id, error = %err, "Confirmation failed");
                self.trail.append(
                    now,
                    AuditEvent::ConfirmFailed {
                        operation_id: operation_id.to_string(),
                        error: err.to_string(),
                    },
                );
                Err(err)
            }
        }
    }

    /// Record executed timers and release the quota they reserved.
    fn record_executed(&mut self, executed: &[RollbackTimer], forced: bool, now: i64) {
        for timer in executed {
            if let Some(resource_type) = &timer.resource_type {
                self.quota.deallocate(resource_type, timer.resource_pct);
            }
            warn!(
                operation_id = %timer.operation_id,
                timer_id = %timer.id,
                forced = forced,
                "Rollback executed"
            );
            self.trail.append(
                now,
                AuditEvent::RollbackExecuted {
                    timer: timer.clone(),
                    forced,
                },
            );
        }
    }

    fn tick(&mut self, now: i64) -> TickReport {
        let executed = self.rollbacks.sweep(now);
        self.record_executed(&executed, false, now);

        let mut expired_approvals = 0;
        for approval_id in self.approvals.prune(now) {
            // Resolved approvals were already unparked; anything left expired.
            if let Some(parked) = self.awaiting.remove(&approval_id) {
                expired_approvals += 1;
                self.trail.append(
                    now,
                    AuditEvent::ApprovalResolved {
                        approval_id,
                        operation_id: parked.operation_id,
                        status: ApprovalStatus::Rejected,
                        outcome: Decision::Denied,
                        reason: "approval expired".to_string(),
                    },
                );
            }
        }

        let level_change = if self.emergency.is_engaged() {
            None
        } else {
            self.posture.evaluate(now, &self.trail)
        };
        if let Some(change) = level_change {
            warn!(
                from = %change.from,
                to = %change.to,
                incidents = change.incidents,
                "Safety level raised"
            );
            self.trail.append(
                now,
                AuditEvent::SafetyLevelChanged {
                    from: change.from,
                    to: change.to,
                    incidents: change.incidents,
                },
            );
        }

        debug!(
            executed = executed.len(),
            expired_approvals = expired_approvals,
            active_rollbacks = self.rollbacks.active_count(),
            "Governor tick"
        );

        TickReport {
            executed,
            expired_approvals,
            level_change,
            safety_level: self.safety_level(),
        }
    }

    // ── Privileged ──────────────────────────────────────────────────────

    fn submit_factor(
        &mut self,
        approval_id: &str,
        factor: &str,
        approved: bool,
        authorized_by: &str,
        now: i64,
    ) -> GovernorResult<FactorOutcome> {
        let submitted = if self.shut_down {
            Err(GovernorError::ShutDown)
        } else {
            self.approvals.submit_factor(approval_id, factor, approved, now)
        };
        let request = match submitted {
            Ok(request) => request,
            Err(err) => {
                warn!(
                    approval_id = approval_id,
                    factor = factor,
                    authorized_by = authorized_by,
                    error = %err,
                    "Factor submission failed"
                );
                self.trail.append(
                    now,
                    AuditEvent::PrivilegedCallFailed {
                        action: "submit_factor".to_string(),
                        authorized_by: authorized_by.to_string(),
                        error: err.to_string(),
                    },
                );
                return Err(err);
            }
        };

        self.trail.append(
            now,
            AuditEvent::FactorSubmitted {
                approval_id: approval_id.to_string(),
                factor: factor.to_string(),
                approved,
                authorized_by: authorized_by.to_string(),
                status: request.status,
            },
        );

        let evaluation = match request.status {
            ApprovalStatus::Pending => None,
            ApprovalStatus::Approved | ApprovalStatus::Rejected => {
                Some(self.resolve(&request, now))
            }
        };

        Ok(FactorOutcome {
            request,
            evaluation,
        })
    }

    /// Settle the operation parked behind a resolved approval.
    fn resolve(&mut self, approval: &ApprovalRequest, now: i64) -> EvaluationResult {
        let operation_id = approval.operation_id.clone();
        let parked = self.awaiting.remove(&approval.id);

        let verdict = match (approval.status, parked) {
            (ApprovalStatus::Approved, Some(parked)) if !self.shut_down => {
                self.commit(&parked.operation_id, &parked.request, now)
            }
            (ApprovalStatus::Approved, Some(_)) => Err(DenialReason::GovernorShutDown),
            _ => Err(DenialReason::ApprovalRejected {
                approval_id: approval.id.clone(),
            }),
        };

        let result = match verdict {
            Ok(timer) => EvaluationResult::allowed(
                operation_id.clone(),
                format!("approved via {}", approval.id),
                timer.id,
            ),
            Err(denial) => EvaluationResult::denied(operation_id.clone(), denial),
        };

        info!(
            approval_id = %approval.id,
            operation_id = %operation_id,
            status = ?approval.status,
            outcome = ?result.decision(),
            "Approval resolved"
        );

        self.trail.append(
            now,
            AuditEvent::ApprovalResolved {
                approval_id: approval.id.clone(),
                operation_id,
                status: approval.status,
                outcome: result.decision(),
                reason: result.reason.clone(),
            },
        );
        result
    }

    fn engage_emergency_stop(&mut self, reason: &str, authorized_by: &str, now: i64) -> StopRecord {
        let already_engaged = self.emergency.engage(reason, authorized_by, now);

        let executed = self.rollbacks.execute_all();
        self.record_executed(&executed, true, now);

        let previous = self.posture.emergency();

        error!(
            reason = reason,
            authorized_by = authorized_by,
            already_engaged = already_engaged,
            rollbacks_executed = executed.len(),
            "EMERGENCY STOP engaged"
        );

        self.trail.append(
            now,
            AuditEvent::EmergencyStopEngaged {
                reason: reason.to_string(),
                authorized_by: authorized_by.to_string(),
                already_engaged,
            },
        );
        if previous != SafetyLevel::EmergencyStop {
            let incidents = self.posture.incidents(now, &self.trail);
            self.trail.append(
                now,
                AuditEvent::SafetyLevelChanged {
                    from: previous,
                    to: SafetyLevel::EmergencyStop,
                    incidents,
                },
            );
        }

        StopRecord {
            reason: reason.to_string(),
            authorized_by: authorized_by.to_string(),
            engaged_at_ms: now,
            already_engaged,
            rollbacks_executed: executed,
        }
    }

    fn reset(&mut self, authorized_by: &str, now: i64) -> ResetRecord {
        let previous_level = self.safety_level();
        self.emergency.reset();

        let discarded_approvals = self.approvals.clear(now);
        self.awaiting.clear();
        let discarded_rollbacks = self.rollbacks.clear();

        let entry = self.trail.append(
            now,
            AuditEvent::Reset {
                authorized_by: authorized_by.to_string(),
                previous_level,
                discarded_approvals,
                discarded_rollbacks,
            },
        );
        self.posture.reset(entry.sequence);

        warn!(
            authorized_by = authorized_by,
            previous_level = %previous_level,
            discarded_approvals = discarded_approvals,
            discarded_rollbacks = discarded_rollbacks,
            "Governor reset to OPERATIONAL"
        );

        ResetRecord {
            authorized_by: authorized_by.to_string(),
            reset_at_ms: now,
            previous_level,
            discarded_approvals,
            discarded_rollbacks,
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────

    fn safety_level(&self) -> SafetyLevel {
        if self.emergency.is_engaged() {
            SafetyLevel::EmergencyStop
        } else {
            self.posture.level()
        }
    }

    fn status(&self, now: i64) -> GovernorStatus {
        GovernorStatus {
            safety_level: self.safety_level(),
            emergency_stopped: self.emergency.is_engaged(),
            pending_approvals: self.approvals.pending_count(now),
            active_rollbacks: self.rollbacks.active_count(),
            resource_usage: self.quota.current(),
            resource_limits: self.quota.limits(),
        }
    }
}

/// Reject requests no control can meaningfully score.
fn validate(request: &OperationRequest) -> Result<(), String> {
    if request.operation_type.trim().is_empty() {
        return Err("operation_type is empty".to_string());
    }
    if request.origin.trim().is_empty() {
        return Err("origin is empty".to_string());
    }
    if request.sector.trim().is_empty() {
        return Err("sector is empty".to_string());
    }
    let pct = request.resource_request_pct;
    if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
        return Err(format!("resource_request_pct {} is outside 0-100", pct));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn governor() -> (SafetyGovernor, PrivilegedChannel, ManualClock) {
        let clock = ManualClock::new(12 * 3_600_000);
        let (governor, channel) =
            SafetyGovernor::with_clock(GovernorConfig::default(), Arc::new(clock.clone()));
        (governor, channel, clock)
    }

    fn energy(pct: f64) -> OperationRequest {
        OperationRequest::new("energy_reallocation", "grid-loop", "energy", pct)
            .with_resource("energy_allocation_pct")
    }

    #[test]
    fn allowed_operation_arms_rollback_and_reserves_quota() {
        let (governor, _, _) = governor();
        let result = governor.evaluate(energy(10.0));
        assert!(result.is_allowed());
        assert!(result.rollback_timer_id.is_some());

        let status = governor.get_status();
        assert_eq!(status.active_rollbacks, 1);
        assert_eq!(status.resource_usage["energy_allocation_pct"], 10.0);
    }

    #[test]
    fn malformed_request_is_denied_and_recorded() {
        let (governor, _, _) = governor();
        let result = governor.evaluate(OperationRequest::new("", "grid-loop", "energy", 1.0));
        assert!(matches!(
            result.denial,
            Some(DenialReason::MalformedRequest { .. })
        ));
        let nan = governor.evaluate(OperationRequest::new("x", "grid-loop", "energy", f64::NAN));
        assert!(nan.is_denied());
        assert_eq!(governor.get_audit_trail(10).len(), 2);
    }

    #[test]
    fn high_risk_goes_pending_then_commits_on_approval() {
        let (governor, channel, _) = governor();
        let pending = governor.evaluate(energy(5.0).high_risk());
        assert!(pending.is_pending());
        let approval_id = pending.approval_id.clone().unwrap();
        assert_eq!(governor.get_status().resource_usage["energy_allocation_pct"], 0.0);

        let step = channel
            .submit_factor(&approval_id, "operator_signoff", true, "alice")
            .unwrap();
        assert!(step.evaluation.is_none());

        let done = channel
            .submit_factor(&approval_id, "safety_officer_signoff", true, "bob")
            .unwrap();
        let evaluation = done.evaluation.unwrap();
        assert!(evaluation.is_allowed());
        assert_eq!(evaluation.operation_id, pending.operation_id);
        assert_eq!(governor.get_status().resource_usage["energy_allocation_pct"], 5.0);
        assert!(governor.confirm(&pending.operation_id).is_ok());
    }

    #[test]
    fn rejected_approval_denies_operation() {
        let (governor, channel, _) = governor();
        let pending = governor.evaluate(energy(5.0).high_risk());
        let approval_id = pending.approval_id.unwrap();
        let outcome = channel
            .submit_factor(&approval_id, "operator_signoff", false, "alice")
            .unwrap();
        assert_eq!(outcome.request.status, ApprovalStatus::Rejected);
        assert!(matches!(
            outcome.evaluation.and_then(|e| e.denial),
            Some(DenialReason::ApprovalRejected { .. })
        ));
        assert_eq!(governor.get_status().active_rollbacks, 0);
    }

    #[test]
    fn expired_rollback_releases_quota() {
        let (governor, _, clock) = governor();
        governor.evaluate(energy(20.0));
        clock.advance(30 * 60_000);
        let report = governor.tick();
        assert_eq!(report.executed.len(), 1);
        assert_eq!(governor.get_status().resource_usage["energy_allocation_pct"], 0.0);
    }

    #[test]
    fn shutdown_denies_new_operations() {
        let (governor, _, _) = governor();
        governor.shutdown();
        governor.shutdown();
        assert!(governor.is_shut_down());
        let result = governor.evaluate(energy(1.0));
        assert_eq!(result.denial, Some(DenialReason::GovernorShutDown));
        let shutdowns = governor
            .get_audit_entries(10)
            .iter()
            .filter(|e| matches!(e.event, AuditEvent::Shutdown))
            .count();
        assert_eq!(shutdowns, 1);
        assert_eq!(governor.confirm("op-1"), Err(GovernorError::ShutDown));
    }

    #[test]
    fn confirm_during_emergency_stop_is_refused() {
        let (governor, channel, _) = governor();
        let result = governor.evaluate(energy(1.0));
        channel.engage_emergency_stop("cascade", "duty-officer");
        assert_eq!(
            governor.confirm(&result.operation_id),
            Err(GovernorError::EmergencyStopEngaged("cascade".to_string()))
        );
    }
}
