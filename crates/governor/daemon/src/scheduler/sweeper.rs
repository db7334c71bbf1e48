//! Periodic governor tick: fires due rollbacks, expires approvals,
//! re-evaluates the safety posture.

use std::sync::Arc;

use governor_core::{SafetyGovernor, TickReport};
use tokio::sync::RwLock;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::config::SchedulerConfig;

/// Drives `SafetyGovernor::tick` on a fixed interval
pub struct Sweeper {
    config: SchedulerConfig,
    governor: SafetyGovernor,
    running: Arc<RwLock<bool>>,
}

impl Sweeper {
    /// Create a new sweeper
    pub fn new(config: SchedulerConfig, governor: SafetyGovernor) -> Arc<Self> {
        Arc::new(Self {
            config,
            governor,
            running: Arc::new(RwLock::new(false)),
        })
    }

    /// Run the sweep loop until `stop` is called or the governor shuts down
    pub async fn start(self: Arc<Self>) {
        {
            let mut running = self.running.write().await;
            *running = true;
        }

        tracing::info!(interval_ms = self.config.tick_interval_ms, "Sweeper started");

        let mut interval = interval(Duration::from_millis(self.config.tick_interval_ms.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            {
                let running = self.running.read().await;
                if !*running {
                    break;
                }
            }

            if self.governor.is_shut_down() {
                break;
            }

            self.sweep_once();
        }

        tracing::info!("Sweeper stopped");
    }

    /// Stop the sweeper
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }

    /// Whether the loop is active
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// One tick, logged
    pub fn sweep_once(&self) -> TickReport {
        let report = self.governor.tick();

        if !report.executed.is_empty() {
            tracing::warn!(
                count = report.executed.len(),
                "Rollbacks executed for unconfirmed operations"
            );
        }
        if report.expired_approvals > 0 {
            tracing::info!(count = report.expired_approvals, "Approval requests expired");
        }
        if let Some(change) = &report.level_change {
            tracing::warn!(
                from = change.from.as_str(),
                to = change.to.as_str(),
                incidents = change.incidents,
                "Safety level changed"
            );
        }

        report
    }
}
