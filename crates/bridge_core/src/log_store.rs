//! Bounded, newest-first log of bridge session events.

use std::collections::VecDeque;

use shared::{domain::LogSeverity, protocol::LogEntry};

pub const DEFAULT_LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone)]
pub struct LogStore {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl LogStore {
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Prepends a new entry and returns a copy of it. Evicts the oldest entry
    /// once the store is full.
    pub fn append(&mut self, message: impl Into<String>, severity: LogSeverity) -> LogEntry {
        let entry = LogEntry::new(message, severity);
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(entry.clone());
        entry
    }

    pub fn clear(&mut self) {
        self.entries.clear();
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

    /// Entries ordered newest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn count_by_severity(&self, severity: LogSeverity) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.severity == severity)
            .count()
    }
}
