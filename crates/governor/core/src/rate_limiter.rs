//! Rate limiter: sliding-window cap per operation type.
//!
//! The limiter keeps no history of its own. It reads the audit trail's
//! operation records newest-first and stops at the first record that has left
//! the window, so a check costs O(recent entries) and nothing is ever pruned
//! eagerly. Only accepted operations (allowed or pending) count; denied
//! attempts do not consume budget. The governor's trail retains accepted
//! records for at least one window, so eviction never shortens the count.

use governor_types::DenialReason;

use crate::audit::AuditTrail;
use crate::config::RateLimitConfig;

/// Outcome of a rate-limit check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitCheck {
    pub allowed: bool,
    /// Accepted operations of this type currently in the window.
    pub count: usize,
    pub reason: String,
}

pub struct RateLimiter {
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config }
    }

    /// Check whether another `operation_type` operation fits in the window ending at `now_ms`.
    ///
    /// The window is `(now - W, now]`: an operation exactly `W` old no longer counts.
    pub fn allow(&self, operation_type: &str, now_ms: i64, trail: &AuditTrail) -> RateLimitCheck {
        let count = self.count_in_window(operation_type, now_ms, trail);
        let limit = self.config.max_per_window;

        if count >= limit {
            RateLimitCheck {
                allowed: false,
                count,
                reason: format!(
                    "{} {} operations in the last {}ms (limit {})",
                    count, operation_type, self.config.window_ms, limit
                ),
            }
        } else {
            RateLimitCheck {
                allowed: true,
                count,
                reason: format!("{}/{} in window", count, limit),
            }
        }
    }

    /// Build the denial for a failed check.
    pub fn denial(&self, operation_type: &str, check: &RateLimitCheck) -> DenialReason {
        DenialReason::RateLimited {
            operation_type: operation_type.to_string(),
            count: check.count,
            limit: self.config.max_per_window,
            window_ms: self.config.window_ms,
        }
    }

    fn count_in_window(&self, operation_type: &str, now_ms: i64, trail: &AuditTrail) -> usize {
        let cutoff = now_ms.saturating_sub(self.config.window_ms);
        let mut count = 0;
        for record in trail.recent_operations() {
            if record.timestamp_ms <= cutoff {
                break;
            }
            if record.operation_type == operation_type && record.is_accepted() {
                count += 1;
            }
        }
        count
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{denied, record_at, trail_of};

    #[test]
    fn allow_within_limits() {
        let limiter = RateLimiter::default();
        let trail = trail_of((0..4).map(|i| record_at("adjust", i * 1_000)));
        let check = limiter.allow("adjust", 5_000, &trail);
        assert!(check.allowed);
        assert_eq!(check.count, 4);
    }

    #[test]
    fn deny_sixth_in_window() {
        let limiter = RateLimiter::default();
        let trail = trail_of((0..5).map(|i| record_at("adjust", i * 1_000)));
        let check = limiter.allow("adjust", 10_000, &trail);
        assert!(!check.allowed);
        assert_eq!(check.count, 5);
        assert!(matches!(
            limiter.denial("adjust", &check),
            DenialReason::RateLimited { limit: 5, .. }
        ));
    }

    #[test]
    fn allow_again_one_window_later() {
        let limiter = RateLimiter::default();
        let trail = trail_of((0..5).map(|_| record_at("adjust", 0)));
        assert!(!limiter.allow("adjust", 59_999, &trail).allowed);
        assert!(limiter.allow("adjust", 60_000, &trail).allowed);
    }

    #[test]
    fn other_types_do_not_count() {
        let limiter = RateLimiter::default();
        let trail = trail_of((0..5).map(|i| record_at("reroute", i)));
        assert!(limiter.allow("adjust", 10, &trail).allowed);
    }

    #[test]
    fn denied_attempts_do_not_count() {
        let limiter = RateLimiter::default();
        let trail = trail_of((0..5).map(|i| denied(record_at("adjust", i))));
        let check = limiter.allow("adjust", 10, &trail);
        assert!(check.allowed);
        assert_eq!(check.count, 0);
    }
}
