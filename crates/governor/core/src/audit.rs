//! Audit trail: bounded, append-only decision log.
//!
//! Every evaluation, approval step, rollback and privileged action is appended
//! here before the governor returns to its caller. The trail is also the
//! read-only history that the rate limiter, the anomaly detector and the
//! safety-level evaluation work from.
//!
//! Bounded: retains the most recent `max_entries` entries and evicts the
//! oldest first, silently. Accepted operation records younger than the
//! retention window are skipped by eviction, so a flood of denied attempts
//! cannot push live rate-limit history out of the trail.

use std::collections::VecDeque;

use governor_types::{AuditEntry, AuditEvent, OperationRecord};

pub struct AuditTrail {
    entries: VecDeque<AuditEntry>,
    max_entries: usize,
    next_sequence: u64,
    retain_accepted_ms: i64,
}

impl AuditTrail {
    /// Create a trail holding at most `max_entries` entries (minimum one).
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            next_sequence: 1,
            retain_accepted_ms: 0,
        }
    }

    /// Keep accepted operation records recorded within `window_ms` of the
    /// newest append, even past `max_entries`.
    pub fn retaining_accepted(mut self, window_ms: i64) -> Self {
        self.retain_accepted_ms = window_ms.max(0);
        self
    }

    /// Append an event and return the entry with its assigned metadata.
    pub fn append(&mut self, recorded_at_ms: i64, event: AuditEvent) -> AuditEntry {
        let entry = AuditEntry {
            sequence: self.next_sequence,
            recorded_at_ms,
            event,
        };
        self.next_sequence += 1;
        self.entries.push_back(entry.clone());
        self.evict(recorded_at_ms);

        entry
    }

    /// Drop the oldest evictable entries until the trail fits its cap.
    fn evict(&mut self, now_ms: i64) {
        let cutoff = now_ms.saturating_sub(self.retain_accepted_ms);
        while self.entries.len() > self.max_entries {
            let victim = self
                .entries
                .iter()
                .position(|entry| !is_retained(entry, cutoff));
            match victim {
                Some(index) => {
                    self.entries.remove(index);
                }
                // Everything left is live rate-limit history.
                None => break,
            }
        }
    }

    /// The last `limit` entries, most recent last.
    pub fn tail(&self, limit: usize) -> Vec<AuditEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// The last `limit` operation records, most recent last.
    pub fn operations(&self, limit: usize) -> Vec<OperationRecord> {
        let mut records: Vec<OperationRecord> =
            self.recent_operations().take(limit).cloned().collect();
        records.reverse();
        records
    }

    /// Entries newest first.
    pub fn iter_recent(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().rev()
    }

    /// Operation records newest first.
    pub fn recent_operations(&self) -> impl Iterator<Item = &OperationRecord> {
        self.iter_recent().filter_map(|entry| entry.operation())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequence of the most recent entry, zero if nothing was ever appended.
    pub fn last_sequence(&self) -> u64 {
        self.next_sequence - 1
    }
}

fn is_retained(entry: &AuditEntry, cutoff_ms: i64) -> bool {
    entry
        .operation()
        .is_some_and(|record| record.is_accepted() && record.timestamp_ms > cutoff_ms)
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(10_000)
    }
}
