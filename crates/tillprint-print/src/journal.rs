// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded in-memory journal of device-level events.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tillprint_core::types::{ConnectionMode, JobId, JobKind};

/// Entries kept before the oldest is dropped.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeviceEvent {
    Opened { mode: ConnectionMode },
    Closed { mode: ConnectionMode },
    PrintStarted { job_id: JobId },
    PrintFinished { job_id: JobId, ok: bool },
    /// The simulated backend accepted a request without touching hardware.
    Simulated { kind: JobKind, detail: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DeviceEvent,
}

/// Shared, cloneable handle on the journal.
#[derive(Debug, Clone)]
pub struct DeviceJournal {
    entries: Arc<Mutex<VecDeque<JournalEntry>>>,
    capacity: usize,
}

impl Default for DeviceJournal {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl DeviceJournal {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<JournalEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, event: DeviceEvent) {
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(JournalEntry {
            at: Utc::now(),
            event,
        });
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<JournalEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.lock().iter().map(|e| e.event.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_entries_fall_off() {
        let journal = DeviceJournal::with_capacity(2);
        journal.push(DeviceEvent::Opened { mode: ConnectionMode::Dummy });
        journal.push(DeviceEvent::Closed { mode: ConnectionMode::Dummy });
        journal.push(DeviceEvent::Opened { mode: ConnectionMode::Lan });
        assert_eq!(
            journal.events(),
            vec![
                DeviceEvent::Closed { mode: ConnectionMode::Dummy },
                DeviceEvent::Opened { mode: ConnectionMode::Lan },
            ]
        );
    }

    #[test]
    fn clones_share_entries() {
        let journal = DeviceJournal::default();
        let other = journal.clone();
        other.push(DeviceEvent::Simulated {
            kind: JobKind::Text,
            detail: "hi".into(),
        });
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn entries_serialize_flat() {
        let journal = DeviceJournal::default();
        journal.push(DeviceEvent::Opened { mode: ConnectionMode::Usb });
        let json = serde_json::to_value(&journal.snapshot()[0]).unwrap();
        assert_eq!(json["event"], "opened");
        assert_eq!(json["mode"], "usb");
        assert!(json.get("at").is_some());
    }
}
