use crate::sector::{EventKind, HistoryEvent};
use serde::{Deserialize, Serialize};

/// Append-only event ledger of a single sector.
///
/// Insertion order is chronological order. Events are never evicted,
/// reordered or removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog {
    events: Vec<HistoryEvent>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event. The timestamp is clamped to the last recorded one so
    /// the ledger stays monotonic if the clock steps backwards.
    pub fn append(&mut self, timestamp: u64, action: impl Into<String>, kind: EventKind) -> &HistoryEvent {
        let timestamp = self
            .events
            .last()
            .map_or(timestamp, |last| timestamp.max(last.timestamp));

        self.events.push(HistoryEvent {
            timestamp,
            action: action.into(),
            kind,
        });

        let len = self.events.len();
        debug_assert!(
            len < 2 || self.events[len - 2].timestamp <= self.events[len - 1].timestamp,
            "History timestamps must be non-decreasing"
        );

        &self.events[len - 1]
    }

    /// Last `n` events, most recent first.
    pub fn recent(&self, n: usize) -> Vec<HistoryEvent> {
        self.events.iter().rev().take(n).cloned().collect()
    }

    pub fn events(&self) -> &[HistoryEvent] {
        &self.events
    }

    pub fn last(&self) -> Option<&HistoryEvent> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count_of(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}
