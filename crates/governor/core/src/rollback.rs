use governor_types::{RollbackStatus, RollbackTimer};
use tracing::debug;
use uuid::Uuid;

use crate::error::{GovernorError, GovernorResult};

const MINUTE_MS: i64 = 60_000;

/// Time-bound automatic reversal of approved operations.
///
/// Holds only ACTIVE timers, in arming order. Confirmation and execution
/// remove a timer from the active set and hand it back to the caller. There
/// is no internal thread: the host drives expiry through [`sweep`](Self::sweep).
pub struct RollbackScheduler {
    active: Vec<RollbackTimer>,
}

impl RollbackScheduler {
    pub fn new() -> Self {
        Self { active: Vec::new() }
    }

    /// Arm a timer expiring `timeout_minutes` from `now_ms`.
    ///
    /// Arming is permissive: arming the same operation twice yields two
    /// independent timers.
    pub fn arm(
        &mut self,
        operation_id: &str,
        operation_type: &str,
        timeout_minutes: i64,
        now_ms: i64,
    ) -> RollbackTimer {
        self.arm_reserving(operation_id, operation_type, timeout_minutes, now_ms, None, 0.0)
    }

    /// Arm a timer that also remembers the quota it reserved, so an executed
    /// rollback can release it.
    pub fn arm_reserving(
        &mut self,
        operation_id: &str,
        operation_type: &str,
        timeout_minutes: i64,
        now_ms: i64,
        resource_type: Option<String>,
        resource_pct: f64,
    ) -> RollbackTimer {
        let timer = RollbackTimer {
            id: format!("rbk-{}", Uuid::new_v4()),
            operation_id: operation_id.to_string(),
            operation_type: operation_type.to_string(),
            status: RollbackStatus::Active,
            created_at: now_ms,
            expiry_at: now_ms.saturating_add(timeout_minutes.max(0).saturating_mul(MINUTE_MS)),
            confirmed: false,
            resource_type,
            resource_pct,
        };

        debug!(
            timer_id = %timer.id,
            operation_id = operation_id,
            expiry_at = timer.expiry_at,
            "Rollback timer armed"
        );

        self.active.push(timer.clone());
        timer
    }

    /// Confirm every active, not-yet-due timer of `operation_id`.
    ///
    /// Returns the most recently armed one. Timers already past their deadline
    /// are left for the next sweep.
    pub fn confirm(&mut self, operation_id: &str, now_ms: i64) -> GovernorResult<RollbackTimer> {
        let (mut confirmed, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|t| t.operation_id == operation_id && !t.is_due(now_ms));
        self.active = rest;

        for timer in &mut confirmed {
            timer.status = RollbackStatus::Confirmed;
            timer.confirmed = true;
        }

        confirmed
            .pop()
            .ok_or_else(|| GovernorError::RollbackNotFound(operation_id.to_string()))
    }

    /// Execute every active timer with `expiry_at <= now_ms`.
    pub fn sweep(&mut self, now_ms: i64) -> Vec<RollbackTimer> {
        let (due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|t| t.is_due(now_ms));
        self.active = rest;
        executed(due)
    }

    /// Execute every active timer regardless of deadline.
    pub fn execute_all(&mut self) -> Vec<RollbackTimer> {
        executed(std::mem::take(&mut self.active))
    }

    /// Discard every active timer without executing it. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.active.len();
        self.active.clear();
        dropped
    }

    pub fn active(&self) -> &[RollbackTimer] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl Default for RollbackScheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn executed(mut timers: Vec<RollbackTimer>) -> Vec<RollbackTimer> {
    for timer in &mut timers {
        timer.status = RollbackStatus::Executed;
    }
    timers
}
