//! Governor configuration.
//!
//! Every threshold the controls use lives here so hosts can tune them without
//! touching code. Defaults reproduce the documented behaviour.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration for a [`SafetyGovernor`](crate::SafetyGovernor).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernorConfig {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub quota: QuotaConfig,

    #[serde(default)]
    pub anomaly: AnomalyConfig,

    #[serde(default)]
    pub approval: ApprovalConfig,

    #[serde(default)]
    pub rollback: RollbackConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub safety_level: SafetyLevelConfig,
}

/// Sliding-window rate limit per operation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_window_ms")]
    pub window_ms: i64,

    #[serde(default = "default_max_per_window")]
    pub max_per_window: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: default_rate_window_ms(),
            max_per_window: default_max_per_window(),
        }
    }
}

/// Hard caps per resource key, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_resource_limits")]
    pub limits: BTreeMap<String, f64>,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            limits: default_resource_limits(),
        }
    }
}

/// Heuristic thresholds for the anomaly detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Window for the burst heuristic.
    #[serde(default = "default_burst_window_ms")]
    pub burst_window_ms: i64,

    /// More than this many operations in the window is anomalous.
    #[serde(default = "default_burst_threshold")]
    pub burst_threshold: usize,

    /// A single request above this share of a capped resource is anomalous.
    #[serde(default = "default_large_request_pct")]
    pub large_request_pct: f64,

    /// First local hour (inclusive) in which locking operations are normal.
    #[serde(default = "default_active_hours_start")]
    pub active_hours_start: u32,

    /// Local hour (exclusive) after which locking operations are anomalous.
    #[serde(default = "default_active_hours_end")]
    pub active_hours_end: u32,

    #[serde(default = "default_resource_locking_types")]
    pub resource_locking_operation_types: Vec<String>,

    /// How many recent operations the sector-spread heuristic inspects.
    #[serde(default = "default_sector_lookback")]
    pub sector_lookback: usize,

    /// More than this many foreign-sector operations in the lookback is anomalous.
    #[serde(default = "default_sector_spread_threshold")]
    pub sector_spread_threshold: usize,

    /// Fixed UTC offset for the active-hours check. `None` uses the host's local zone.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            burst_window_ms: default_burst_window_ms(),
            burst_threshold: default_burst_threshold(),
            large_request_pct: default_large_request_pct(),
            active_hours_start: default_active_hours_start(),
            active_hours_end: default_active_hours_end(),
            resource_locking_operation_types: default_resource_locking_types(),
            sector_lookback: default_sector_lookback(),
            sector_spread_threshold: default_sector_spread_threshold(),
            utc_offset_minutes: None,
        }
    }
}

/// Multi-factor approval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalConfig {
    #[serde(default = "default_required_factors")]
    pub required_factors: u32,

    #[serde(default = "default_approval_timeout_ms")]
    pub timeout_ms: i64,

    /// Factor names in seeding order. The first one is satisfied at creation.
    #[serde(default = "default_factor_names")]
    pub factor_names: Vec<String>,

    /// Operation types that always require approval.
    #[serde(default)]
    pub high_risk_operation_types: Vec<String>,

    /// Deny anomalous operations outright instead of routing them to approval.
    #[serde(default)]
    pub deny_on_anomaly: bool,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            required_factors: default_required_factors(),
            timeout_ms: default_approval_timeout_ms(),
            factor_names: default_factor_names(),
            high_risk_operation_types: Vec::new(),
            deny_on_anomaly: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackConfig {
    #[serde(default = "default_rollback_timeout_minutes")]
    pub timeout_minutes: i64,
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: default_rollback_timeout_minutes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_max_entries")]
    pub max_entries: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_entries: default_audit_max_entries(),
        }
    }
}

/// Incident counts that raise the safety level.
///
/// Incidents are denials, anomalous evaluations and rollbacks executed by
/// expiry, counted over `window_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyLevelConfig {
    #[serde(default = "default_level_window_ms")]
    pub window_ms: i64,

    #[serde(default = "default_caution_threshold")]
    pub caution_threshold: usize,

    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: usize,

    #[serde(default = "default_lockdown_threshold")]
    pub lockdown_threshold: usize,
}

impl Default for SafetyLevelConfig {
    fn default() -> Self {
        Self {
            window_ms: default_level_window_ms(),
            caution_threshold: default_caution_threshold(),
            warning_threshold: default_warning_threshold(),
            lockdown_threshold: default_lockdown_threshold(),
        }
    }
}

// Default value helpers
fn default_rate_window_ms() -> i64 {
    60_000
}

fn default_max_per_window() -> usize {
    5
}

fn default_resource_limits() -> BTreeMap<String, f64> {
    let mut limits = BTreeMap::new();
    limits.insert("energy_allocation_pct".to_string(), 40.0);
    limits.insert("compute_allocation_pct".to_string(), 60.0);
    limits.insert("network_bandwidth_pct".to_string(), 50.0);
    limits.insert("water_allocation_pct".to_string(), 35.0);
    limits
}

fn default_burst_window_ms() -> i64 {
    60_000
}

fn default_burst_threshold() -> usize {
    10
}

fn default_large_request_pct() -> f64 {
    30.0
}

fn default_active_hours_start() -> u32 {
    6
}

fn default_active_hours_end() -> u32 {
    22
}

fn default_resource_locking_types() -> Vec<String> {
    vec![
        "resource_lock".to_string(),
        "sector_isolation".to_string(),
        "grid_lockout".to_string(),
    ]
}

fn default_sector_lookback() -> usize {
    10
}

fn default_sector_spread_threshold() -> usize {
    3
}

fn default_required_factors() -> u32 {
    3
}

fn default_approval_timeout_ms() -> i64 {
    300_000
}

fn default_factor_names() -> Vec<String> {
    vec![
        "authentication".to_string(),
        "operator_signoff".to_string(),
        "safety_officer_signoff".to_string(),
    ]
}

fn default_rollback_timeout_minutes() -> i64 {
    30
}

fn default_audit_max_entries() -> usize {
    10_000
}

fn default_level_window_ms() -> i64 {
    300_000
}

fn default_caution_threshold() -> usize {
    3
}

fn default_warning_threshold() -> usize {
    6
}

fn default_lockdown_threshold() -> usize {
    10
}
