use std::collections::VecDeque;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A single diagnostic log entry kept in the ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Fixed-capacity log buffer with strictly FIFO eviction: once full, each
/// push drops the oldest entry. Entries are never reordered.
pub struct LogRing {
    capacity: usize,
    entries: RwLock<VecDeque<LogEntry>>,
}

impl LogRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    pub fn push(&self, level: LogLevel, message: impl Into<String>, data: Option<Value>) {
        let entry = LogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            message: message.into(),
            data,
        };
        let mut entries = self.entries.write().expect("log ring lock poisoned");
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn info(&self, message: impl Into<String>, data: Option<Value>) {
        self.push(LogLevel::Info, message, data);
    }

    pub fn warn(&self, message: impl Into<String>, data: Option<Value>) {
        self.push(LogLevel::Warn, message, data);
    }

    pub fn error(&self, message: impl Into<String>, data: Option<Value>) {
        self.push(LogLevel::Error, message, data);
    }

    /// Up to `limit` entries, most-recent-first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.read().expect("log ring lock poisoned");
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("log ring lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
