//! Resource quota manager: hard caps on cumulative allocation.
//!
//! Usage is only ever changed through `allocate`/`deallocate`, which keep
//! `0 <= current <= max` for every tracked resource. Resource keys without a
//! configured cap are a pass-through: always allowed and never tracked.

use std::collections::BTreeMap;

use governor_types::ResourceUsage;
use tracing::debug;

use crate::config::QuotaConfig;

// Float slack so that allocating exactly up to the cap is accepted.
const EPSILON: f64 = 1e-9;

/// Outcome of a quota check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuotaCheck {
    pub allowed: bool,
    /// Headroom left under the cap; infinite for uncapped resources.
    pub available_pct: f64,
}

pub struct ResourceQuotaManager {
    usage: BTreeMap<String, ResourceUsage>,
}

impl ResourceQuotaManager {
    pub fn new(config: QuotaConfig) -> Self {
        let usage = config
            .limits
            .into_iter()
            .map(|(resource, max_pct)| {
                (
                    resource,
                    ResourceUsage {
                        current_pct: 0.0,
                        max_pct: max_pct.max(0.0),
                    },
                )
            })
            .collect();
        Self { usage }
    }

    /// Check whether `requested_pct` fits under the cap of `resource_type`.
    pub fn check(&self, resource_type: &str, requested_pct: f64) -> QuotaCheck {
        let Some(usage) = self.usage.get(resource_type) else {
            return QuotaCheck {
                allowed: valid_amount(requested_pct),
                available_pct: f64::INFINITY,
            };
        };

        let available_pct = usage.available_pct();
        QuotaCheck {
            allowed: valid_amount(requested_pct) && requested_pct <= available_pct + EPSILON,
            available_pct,
        }
    }

    /// Reserve `amount_pct` of `resource_type`. Succeeds only if `check` passes.
    pub fn allocate(&mut self, resource_type: &str, amount_pct: f64) -> bool {
        if !self.check(resource_type, amount_pct).allowed {
            return false;
        }
        if let Some(usage) = self.usage.get_mut(resource_type) {
            usage.current_pct = (usage.current_pct + amount_pct).min(usage.max_pct);
            debug!(
                resource = resource_type,
                amount = amount_pct,
                current = usage.current_pct,
                "Quota allocated"
            );
        }
        true
    }

    /// Release `amount_pct` of `resource_type`, clamping at zero.
    pub fn deallocate(&mut self, resource_type: &str, amount_pct: f64) {
        if !valid_amount(amount_pct) {
            return;
        }
        if let Some(usage) = self.usage.get_mut(resource_type) {
            usage.current_pct = (usage.current_pct - amount_pct).max(0.0);
            debug!(
                resource = resource_type,
                amount = amount_pct,
                current = usage.current_pct,
                "Quota released"
            );
        }
    }

    /// Whether `resource_type` has a configured cap.
    pub fn is_capped(&self, resource_type: &str) -> bool {
        self.usage.contains_key(resource_type)
    }

    pub fn usage(&self, resource_type: &str) -> Option<ResourceUsage> {
        self.usage.get(resource_type).copied()
    }

    /// Resource key → current allocation.
    pub fn current(&self) -> BTreeMap<String, f64> {
        self.usage
            .iter()
            .map(|(k, u)| (k.clone(), u.current_pct))
            .collect()
    }

    /// Resource key → cap.
    pub fn limits(&self) -> BTreeMap<String, f64> {
        self.usage
            .iter()
            .map(|(k, u)| (k.clone(), u.max_pct))
            .collect()
    }
}

impl Default for ResourceQuotaManager {
    fn default() -> Self {
        Self::new(QuotaConfig::default())
    }
}

fn valid_amount(amount_pct: f64) -> bool {
    amount_pct.is_finite() && amount_pct >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENERGY: &str = "energy_allocation_pct";

    #[test]
    fn energy_scenario_up_to_cap() {
        let mut quota = ResourceQuotaManager::default();
        assert!(quota.allocate(ENERGY, 35.0));

        let check = quota.check(ENERGY, 10.0);
        assert!(!check.allowed);
        assert!((check.available_pct - 5.0).abs() < 1e-9);
        assert!(!quota.allocate(ENERGY, 10.0));

        assert!(quota.allocate(ENERGY, 5.0));
        assert_eq!(quota.usage(ENERGY).unwrap().current_pct, 40.0);
        assert!(!quota.check(ENERGY, 0.1).allowed);
    }

    #[test]
    fn unknown_resource_is_pass_through() {
        let mut quota = ResourceQuotaManager::default();
        let check = quota.check("antimatter_pct", 500.0);
        assert!(check.allowed);
        assert!(check.available_pct.is_infinite());
        assert!(quota.allocate("antimatter_pct", 500.0));
        assert!(!quota.is_capped("antimatter_pct"));
        assert!(!quota.current().contains_key("antimatter_pct"));
    }

    #[test]
    fn deallocate_clamps_at_zero() {
        let mut quota = ResourceQuotaManager::default();
        quota.allocate(ENERGY, 10.0);
        quota.deallocate(ENERGY, 25.0);
        assert_eq!(quota.usage(ENERGY).unwrap().current_pct, 0.0);
    }

    #[test]
    fn invalid_amounts_rejected() {
        let mut quota = ResourceQuotaManager::default();
        assert!(!quota.check(ENERGY, -1.0).allowed);
        assert!(!quota.allocate(ENERGY, f64::NAN));
        quota.allocate(ENERGY, 10.0);
        quota.deallocate(ENERGY, f64::INFINITY);
        assert_eq!(quota.usage(ENERGY).unwrap().current_pct, 10.0);
    }

    #[test]
    fn limits_reported() {
        let quota = ResourceQuotaManager::default();
        assert_eq!(quota.limits()[ENERGY], 40.0);
        assert_eq!(quota.current()[ENERGY], 0.0);
    }
}
