//! Safety level evaluation.
//!
//! Incidents are read back from the audit trail: denied or anomalous
//! evaluations, approvals that resolved into a denial, and rollbacks executed
//! because their deadline passed. The level derived from the count only ever
//! moves up; `EMERGENCY_STOP` is only reached through the stop controller and
//! everything returns to `OPERATIONAL` on reset. Incidents recorded before
//! the last reset are not counted again.

use governor_types::{AuditEvent, Decision, SafetyLevel};

use crate::audit::AuditTrail;
use crate::config::SafetyLevelConfig;

/// A level change produced by [`SafetyPosture::evaluate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelChange {
    pub from: SafetyLevel,
    pub to: SafetyLevel,
    pub incidents: usize,
}

pub struct SafetyPosture {
    config: SafetyLevelConfig,
    level: SafetyLevel,
    /// Only entries with a higher sequence count as incidents.
    baseline_sequence: u64,
}

impl SafetyPosture {
    pub fn new(config: SafetyLevelConfig) -> Self {
        Self {
            config,
            level: SafetyLevel::Operational,
            baseline_sequence: 0,
        }
    }

    pub fn level(&self) -> SafetyLevel {
        self.level
    }

    /// Re-derive the level from recent incidents. Returns the change, if any.
    pub fn evaluate(&mut self, now_ms: i64, trail: &AuditTrail) -> Option<LevelChange> {
        let incidents = self.incidents(now_ms, trail);
        let next = self.level.escalate(self.level_for(incidents));
        if next == self.level {
            return None;
        }
        let change = LevelChange {
            from: self.level,
            to: next,
            incidents,
        };
        self.level = next;
        Some(change)
    }

    /// Jump straight to `EMERGENCY_STOP`. Returns the previous level.
    pub fn emergency(&mut self) -> SafetyLevel {
        std::mem::replace(&mut self.level, SafetyLevel::EmergencyStop)
    }

    /// Return to `OPERATIONAL`, forgetting incidents up to `after_sequence`.
    /// Returns the previous level.
    pub fn reset(&mut self, after_sequence: u64) -> SafetyLevel {
        self.baseline_sequence = after_sequence;
        std::mem::replace(&mut self.level, SafetyLevel::Operational)
    }

    /// Incidents recorded in `(now - window, now]`.
    pub fn incidents(&self, now_ms: i64, trail: &AuditTrail) -> usize {
        let cutoff = now_ms.saturating_sub(self.config.window_ms);
        trail
            .iter_recent()
            .take_while(|entry| {
                entry.recorded_at_ms > cutoff && entry.sequence > self.baseline_sequence
            })
            .filter(|entry| is_incident(&entry.event))
            .count()
    }

    fn level_for(&self, incidents: usize) -> SafetyLevel {
        if incidents >= self.config.lockdown_threshold {
            SafetyLevel::Lockdown
        } else if incidents >= self.config.warning_threshold {
            SafetyLevel::Warning
        } else if incidents >= self.config.caution_threshold {
            SafetyLevel::Caution
        } else {
            SafetyLevel::Operational
        }
    }
}

impl Default for SafetyPosture {
    fn default() -> Self {
        Self::new(SafetyLevelConfig::default())
    }
}

fn is_incident(event: &AuditEvent) -> bool {
    match event {
        AuditEvent::OperationEvaluated(record) => {
            record.decision == Decision::Denied || record.anomalous
        }
        AuditEvent::ApprovalResolved { outcome, .. } => *outcome == Decision::Denied,
        AuditEvent::RollbackExecuted { forced, .. } => !forced,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{denied, record_at};

    fn trail_with_denials(count: i64, at: i64) -> AuditTrail {
        let mut trail = AuditTrail::new(100);
        for i in 0..count {
            trail.append(
                at + i,
                AuditEvent::OperationEvaluated(denied(record_at("adjust", at + i))),
            );
        }
        trail
    }

    #[test]
    fn thresholds_raise_level() {
        let mut posture = SafetyPosture::default();
        assert!(posture.evaluate(10, &trail_with_denials(2, 0)).is_none());

        let change = posture.evaluate(10, &trail_with_denials(3, 0)).unwrap();
        assert_eq!(change.to, SafetyLevel::Caution);
        assert_eq!(change.incidents, 3);

        posture.evaluate(20, &trail_with_denials(6, 0));
        assert_eq!(posture.level(), SafetyLevel::Warning);

        posture.evaluate(20, &trail_with_denials(10, 0));
        assert_eq!(posture.level(), SafetyLevel::Lockdown);
    }

    #[test]
    fn level_never_drops_on_its_own() {
        let mut posture = SafetyPosture::default();
        posture.evaluate(10, &trail_with_denials(6, 0));
        assert_eq!(posture.level(), SafetyLevel::Warning);
        assert!(posture.evaluate(10_000_000, &trail_with_denials(6, 0)).is_none());
        assert_eq!(posture.level(), SafetyLevel::Warning);
    }

    #[test]
    fn old_incidents_leave_the_window() {
        let posture = SafetyPosture::default();
        let trail = trail_with_denials(5, 0);
        assert_eq!(posture.incidents(300_000, &trail), 4);
        assert_eq!(posture.incidents(300_005, &trail), 0);
    }

    #[test]
    fn accepted_operations_are_not_incidents() {
        let mut trail = AuditTrail::new(10);
        trail.append(0, AuditEvent::OperationEvaluated(record_at("adjust", 0)));
        assert_eq!(SafetyPosture::default().incidents(1, &trail), 0);
    }

    #[test]
    fn emergency_and_reset() {
        let mut posture = SafetyPosture::default();
        posture.evaluate(10, &trail_with_denials(3, 0));
        assert_eq!(posture.emergency(), SafetyLevel::Caution);
        assert_eq!(posture.level(), SafetyLevel::EmergencyStop);
        assert_eq!(posture.reset(0), SafetyLevel::EmergencyStop);
        assert_eq!(posture.level(), SafetyLevel::Operational);
    }

    #[test]
    fn incidents_before_reset_are_forgotten() {
        let mut posture = SafetyPosture::default();
        let trail = trail_with_denials(6, 0);
        posture.evaluate(10, &trail);
        assert_eq!(posture.level(), SafetyLevel::Warning);

        posture.reset(trail.last_sequence());
        assert_eq!(posture.incidents(10, &trail), 0);
        assert!(posture.evaluate(10, &trail).is_none());
    }
}
