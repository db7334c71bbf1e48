//! Emergency stop: the global override.
//!
//! The stop flag is an `Arc<AtomicBool>` shared between the controller and
//! any number of [`EmergencyStopHandle`]s, so a stop can be raised and read
//! without taking the governor lock. Everything else (who engaged it and
//! why) lives in the controller and is only touched under the lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheap, cloneable view of the stop flag.
#[derive(Clone, Debug, Default)]
pub struct EmergencyStopHandle {
    flag: Arc<AtomicBool>,
}

impl EmergencyStopHandle {
    /// Raise the flag. Returns whether it was already raised.
    pub fn raise(&self) -> bool {
        self.flag.swap(true, Ordering::SeqCst)
    }

    pub fn is_engaged(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Who engaged the stop, why and when.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Engagement {
    pub reason: String,
    pub authorized_by: String,
    pub engaged_at_ms: i64,
}

#[derive(Debug, Default)]
pub struct EmergencyStopController {
    handle: EmergencyStopHandle,
    engagement: Option<Engagement>,
}

impl EmergencyStopController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> EmergencyStopHandle {
        self.handle.clone()
    }

    /// Engage (or re-engage) the stop. Returns whether it was already engaged.
    ///
    /// Re-engaging replaces the recorded reason and timestamp.
    pub fn engage(&mut self, reason: &str, authorized_by: &str, now_ms: i64) -> bool {
        self.handle.raise();
        let already_engaged = self.engagement.is_some();
        self.engagement = Some(Engagement {
            reason: reason.to_string(),
            authorized_by: authorized_by.to_string(),
            engaged_at_ms: now_ms,
        });
        already_engaged
    }

    /// Clear the stop. Returns the engagement that was in force, if any.
    pub fn reset(&mut self) -> Option<Engagement> {
        self.handle.flag.store(false, Ordering::SeqCst);
        self.engagement.take()
    }

    pub fn is_engaged(&self) -> bool {
        self.handle.is_engaged()
    }

    /// The reason to report for a denial while stopped.
    pub fn reason(&self) -> String {
        self.engagement
            .as_ref()
            .map(|e| e.reason.clone())
            .unwrap_or_else(|| "emergency stop engaged".to_string())
    }

    pub fn engagement(&self) -> Option<&Engagement> {
        self.engagement.as_ref()
    }
}
