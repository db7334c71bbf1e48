use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rollback::RollbackTimer;
use crate::safety::SafetyLevel;

/// Current and maximum allocation of one resource, in percent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub current_pct: f64,
    pub max_pct: f64,
}

impl ResourceUsage {
    pub fn available_pct(&self) -> f64 {
        (self.max_pct - self.current_pct).max(0.0)
    }
}

/// Polling snapshot returned by `get_status()`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GovernorStatus {
    pub safety_level: SafetyLevel,
    pub emergency_stopped: bool,
    pub pending_approvals: usize,
    pub active_rollbacks: usize,
    /// Resource key → current allocation.
    pub resource_usage: BTreeMap<String, f64>,
    /// Resource key → hard cap.
    pub resource_limits: BTreeMap<String, f64>,
}

/// Reply to an emergency-stop engagement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    pub reason: String,
    pub authorized_by: String,
    pub engaged_at_ms: i64,
    /// True when the stop was already engaged and only the reason was refreshed.
    pub already_engaged: bool,
    /// Timers forced to EXECUTED by this engagement.
    pub rollbacks_executed: Vec<RollbackTimer>,
}

/// Reply to a full reset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResetRecord {
    pub authorized_by: String,
    pub reset_at_ms: i64,
    pub previous_level: SafetyLevel,
    pub discarded_approvals: usize,
    pub discarded_rollbacks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_never_negative() {
        let usage = ResourceUsage {
            current_pct: 40.0,
            max_pct: 40.0,
        };
        assert_eq!(usage.available_pct(), 0.0);
        let usage = ResourceUsage {
            current_pct: 35.0,
            max_pct: 40.0,
        };
        assert_eq!(usage.available_pct(), 5.0);
    }
}
