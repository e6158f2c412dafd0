use crate::models::LogEntry;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of analyses kept per session, and the most a log will hold
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Bounded log of past analyses, newest first
///
/// Every record is kept, even if it repeats the previous one. Once the log
/// is full, recording drops the oldest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl HistoryLog {
    /// Create an empty log
    ///
    /// Capacity is clamped to `1..=DEFAULT_HISTORY_CAPACITY`, so the latest
    /// analysis is always visible and the log never grows past 50 entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, DEFAULT_HISTORY_CAPACITY);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert at the front, evicting the oldest entries past capacity
    pub fn record(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries from newest to oldest
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Owned copy, newest first
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
