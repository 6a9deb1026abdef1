//! Change detection between consecutive status snapshots.
//!
//! Holds the last observed status per line and emits a [`ChangeEvent`] when a
//! line's status differs from what was remembered. Transitions into
//! "Good Service" update memory silently: recoveries are never announced.

use std::collections::HashMap;

use crate::models::{ChangeEvent, LineStatus};

/// Stateful diff engine over line statuses.
///
/// The remembered map lives for the process lifetime only. After a restart
/// every line starts unknown, so statuses already known before the restart
/// may be announced again.
#[derive(Debug, Clone, Default)]
pub struct StatusDiff {
    last_seen: HashMap<String, String>,
}

impl StatusDiff {
    /// Create an empty diff engine. Every line's first degraded status will
    /// be reported as a change.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a diff engine seeded with known statuses.
    pub fn with_state(last_seen: HashMap<String, String>) -> Self {
        Self { last_seen }
    }

    /// Number of lines currently remembered.
    pub fn tracked(&self) -> usize {
        self.last_seen.len()
    }

    /// Compare a snapshot against remembered statuses.
    ///
    /// Memory is updated for every line in the snapshot whether or not an
    /// event comes out. An event is emitted only when the status differs
    /// from the remembered value (an unknown line counts as differing) and
    /// the new status is not the no-issue one. Lines missing from the
    /// snapshot keep their stale entries; they only gate future comparisons
    /// for the same name.
    pub fn observe(&mut self, snapshot: &[LineStatus]) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        for line in snapshot {
            let previous = self
                .last_seen
                .insert(line.name.clone(), line.status.clone());
            let changed = previous.as_deref() != Some(line.status.as_str());
            if changed && !line.is_good_service() {
                events.push(ChangeEvent {
                    previous,
                    line: line.clone(),
                });
            }
        }
        events
    }
}
