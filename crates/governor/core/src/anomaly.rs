//! Anomaly detector: heuristic scoring over recent operation history.
//!
//! Stateless: every call reads the audit trail's operation records and the
//! request under evaluation. Four independent heuristics are unioned; any
//! one firing marks the request anomalous:
//!
//! - **burst**: more than `burst_threshold` operations of any kind in the window
//! - **large request**: more than `large_request_pct` of a capped resource
//! - **off-hours lock**: a resource-locking type outside the active hours
//! - **sector spread**: more than `sector_spread_threshold` of the last
//!   `sector_lookback` operations in another sector

use chrono::{DateTime, FixedOffset, Local, Timelike};
use governor_types::OperationRequest;
use tracing::debug;

use crate::audit::AuditTrail;
use crate::config::AnomalyConfig;

/// Which heuristic fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnomalyTrigger {
    Burst,
    LargeRequest,
    OffHoursLock,
    SectorSpread,
}

/// Result of scoring one request.
#[derive(Clone, Debug, PartialEq)]
pub struct AnomalyScore {
    pub is_anomalous: bool,
    pub description: String,
    pub triggers: Vec<AnomalyTrigger>,
}

impl AnomalyScore {
    fn normal() -> Self {
        Self {
            is_anomalous: false,
            description: "no anomaly detected".to_string(),
            triggers: Vec::new(),
        }
    }
}

pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    /// Score `request` against the history in `trail`.
    ///
    /// `resource_capped` tells the detector whether the request's resource
    /// key has a quota; the large-request heuristic only applies to capped
    /// resources.
    pub fn score(
        &self,
        request: &OperationRequest,
        now_ms: i64,
        trail: &AuditTrail,
        resource_capped: bool,
    ) -> AnomalyScore {
        let mut triggers = Vec::new();
        let mut findings = Vec::new();

        let burst = self.recent_count(now_ms, trail);
        if burst > self.config.burst_threshold {
            triggers.push(AnomalyTrigger::Burst);
            findings.push(format!(
                "{} operations in the last {}ms exceeds {}",
                burst, self.config.burst_window_ms, self.config.burst_threshold
            ));
        }

        if resource_capped && request.resource_request_pct > self.config.large_request_pct {
            triggers.push(AnomalyTrigger::LargeRequest);
            findings.push(format!(
                "request of {:.1}% exceeds {:.1}% of a capped resource",
                request.resource_request_pct, self.config.large_request_pct
            ));
        }

        if self.is_locking(&request.operation_type) {
            if let Some(hour) = self.local_hour(now_ms) {
                if !self.within_active_hours(hour) {
                    triggers.push(AnomalyTrigger::OffHoursLock);
                    findings.push(format!(
                        "{} at {:02}:00 outside active hours {:02}:00-{:02}:00",
                        request.operation_type,
                        hour,
                        self.config.active_hours_start,
                        self.config.active_hours_end
                    ));
                }
            }
        }

        let foreign = self.foreign_sector_count(&request.sector, trail);
        if foreign > self.config.sector_spread_threshold {
            triggers.push(AnomalyTrigger::SectorSpread);
            findings.push(format!(
                "{} of the last {} operations outside sector {}",
                foreign, self.config.sector_lookback, request.sector
            ));
        }

        if triggers.is_empty() {
            return AnomalyScore::normal();
        }

        debug!(
            operation_type = %request.operation_type,
            triggers = ?triggers,
            "Anomaly heuristics fired"
        );

        AnomalyScore {
            is_anomalous: true,
            description: findings.join("; "),
            triggers,
        }
    }

    /// Operations of any kind and outcome in `(now - window, now]`.
    fn recent_count(&self, now_ms: i64, trail: &AuditTrail) -> usize {
        let cutoff = now_ms.saturating_sub(self.config.burst_window_ms);
        trail
            .recent_operations()
            .take_while(|record| record.timestamp_ms > cutoff)
            .count()
    }

    fn foreign_sector_count(&self, sector: &str, trail: &AuditTrail) -> usize {
        trail
            .recent_operations()
            .take(self.config.sector_lookback)
            .filter(|record| record.sector != sector)
            .count()
    }

    fn is_locking(&self, operation_type: &str) -> bool {
        self.config
            .resource_locking_operation_types
            .iter()
            .any(|t| t == operation_type)
    }

    fn local_hour(&self, now_ms: i64) -> Option<u32> {
        let utc = DateTime::from_timestamp_millis(now_ms)?;
        match self.config.utc_offset_minutes {
            Some(minutes) => {
                let offset = FixedOffset::east_opt(minutes.checked_mul(60)?)?;
                Some(utc.with_timezone(&offset).hour())
            }
            None => Some(utc.with_timezone(&Local).hour()),
        }
    }

    fn within_active_hours(&self, hour: u32) -> bool {
        let (start, end) = (self.config.active_hours_start, self.config.active_hours_end);
        if start <= end {
            hour >= start && hour < end
        } else {
            // Window wraps midnight.
            hour >= start || hour < end
        }
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(AnomalyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{in_sector, record_at, trail_of};

    const HOUR_MS: i64 = 3_600_000;

    fn utc_detector() -> AnomalyDetector {
        AnomalyDetector::new(AnomalyConfig {
            utc_offset_minutes: Some(0),
            ..AnomalyConfig::default()
        })
    }

    fn request() -> OperationRequest {
        OperationRequest::new("energy_reallocation", "grid-loop", "energy", 5.0)
    }

    #[test]
    fn eleven_recent_operations_is_a_burst() {
        let detector = utc_detector();
        let now = 12 * HOUR_MS;
        let eleven = trail_of((0..11).map(|i| record_at("energy_reallocation", now - i * 1_000)));
        let ten = trail_of((0..10).map(|i| record_at("energy_reallocation", now - i * 1_000)));

        let score = detector.score(&request(), now, &eleven, false);
        assert!(score.is_anomalous);
        assert_eq!(score.triggers, vec![AnomalyTrigger::Burst]);

        assert!(!detector.score(&request(), now, &ten, false).is_anomalous);
    }

    #[test]
    fn old_operations_do_not_count_towards_burst() {
        let detector = utc_detector();
        let now = 12 * HOUR_MS;
        let trail = trail_of((0..11).map(|i| record_at("energy_reallocation", now - 60_000 - i)));
        assert!(!detector.score(&request(), now, &trail, false).is_anomalous);
    }

    #[test]
    fn large_request_only_for_capped_resources() {
        let detector = utc_detector();
        let big = OperationRequest::new("energy_reallocation", "grid-loop", "energy", 31.0);
        let trail = AuditTrail::new(10);

        let score = detector.score(&big, 12 * HOUR_MS, &trail, true);
        assert_eq!(score.triggers, vec![AnomalyTrigger::LargeRequest]);
        assert!(!detector.score(&big, 12 * HOUR_MS, &trail, false).is_anomalous);

        let exact = OperationRequest::new("energy_reallocation", "grid-loop", "energy", 30.0);
        assert!(!detector.score(&exact, 12 * HOUR_MS, &trail, true).is_anomalous);
    }

    #[test]
    fn locking_operation_off_hours() {
        let detector = utc_detector();
        let lock = OperationRequest::new("grid_lockout", "ops", "energy", 1.0);
        let trail = AuditTrail::new(10);

        assert!(detector.score(&lock, 3 * HOUR_MS, &trail, false).is_anomalous);
        assert!(detector.score(&lock, 22 * HOUR_MS, &trail, false).is_anomalous);
        assert!(!detector.score(&lock, 6 * HOUR_MS, &trail, false).is_anomalous);
        assert!(!detector.score(&lock, 21 * HOUR_MS + 59 * 60_000, &trail, false).is_anomalous);

        // Non-locking types are fine at night.
        assert!(!detector.score(&request(), 3 * HOUR_MS, &trail, false).is_anomalous);
    }

    #[test]
    fn fixed_offset_shifts_local_hour() {
        let detector = AnomalyDetector::new(AnomalyConfig {
            utc_offset_minutes: Some(-5 * 60),
            ..AnomalyConfig::default()
        });
        let lock = OperationRequest::new("resource_lock", "ops", "water", 1.0);
        // 10:00 UTC is 05:00 at UTC-5.
        let score = detector.score(&lock, 10 * HOUR_MS, &AuditTrail::new(10), false);
        assert_eq!(score.triggers, vec![AnomalyTrigger::OffHoursLock]);
    }

    #[test]
    fn sector_spread() {
        let detector = utc_detector();
        let now = 12 * HOUR_MS;
        let mut records: Vec<_> = (0..6)
            .map(|i| record_at("energy_reallocation", now - 600_000 + i))
            .collect();
        records.extend((0..4).map(|i| in_sector(record_at("reroute", now - 500_000 + i), "water")));

        let score = detector.score(&request(), now, &trail_of(records.clone()), false);
        assert_eq!(score.triggers, vec![AnomalyTrigger::SectorSpread]);

        records.pop();
        assert!(!detector.score(&request(), now, &trail_of(records), false).is_anomalous);
    }

    #[test]
    fn triggers_are_unioned() {
        let detector = utc_detector();
        let now = 2 * HOUR_MS;
        let trail = trail_of((0..11).map(|i| in_sector(record_at("x", now - i), "water")));
        let lock = OperationRequest::new("sector_isolation", "ops", "energy", 45.0);

        let score = detector.score(&lock, now, &trail, true);
        assert_eq!(score.triggers.len(), 4);
        assert!(score.description.contains("outside active hours"));
    }
}
