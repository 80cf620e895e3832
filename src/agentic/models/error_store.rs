use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorLevel {
    Warning,
    Error,
}

#[derive(Clone, Debug)]
pub struct ErrorEntry {
    pub timestamp: SystemTime,
    pub level: ErrorLevel,
    pub message: String,
    pub target: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub fields: HashMap<String, String>,
}

/// Recent warnings and errors collected from the log stream.
#[derive(Clone)]
pub struct ErrorStore {
    entries: Arc<Mutex<VecDeque<ErrorEntry>>>,
    max_entries: usize,
}

impl ErrorStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            max_entries,
        }
    }

    pub fn add_entry(&self, entry: ErrorEntry) {
        let mut entries = self.entries.lock();
        entries.push_back(entry);

        // FIFO eviction when exceeding max
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
    }

    pub fn get_all_entries(&self) -> Vec<ErrorEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Up to `limit` entries, newest first
    pub fn recent(&self, limit: usize) -> Vec<ErrorEntry> {
        self.entries.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn error_count(&self) -> usize {
        self.count(ErrorLevel::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(ErrorLevel::Warning)
    }

    fn count(&self, level: ErrorLevel) -> usize {
        self.entries.lock().iter().filter(|e| e.level == level).count()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: ErrorLevel, message: &str) -> ErrorEntry {
        ErrorEntry {
            timestamp: SystemTime::now(),
            level,
            message: message.to_string(),
            target: "agentic_chat::test".to_string(),
            file: None,
            line: None,
            fields: HashMap::new(),
        }
    }

    #[test]
    fn test_evicts_oldest_beyond_capacity() {
        let store = ErrorStore::new(2);
        store.add_entry(entry(ErrorLevel::Error, "first"));
        store.add_entry(entry(ErrorLevel::Warning, "second"));
        store.add_entry(entry(ErrorLevel::Error, "third"));

        let messages: Vec<String> = store
            .get_all_entries()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["second", "third"]);
        assert_eq!(store.recent(1)[0].message, "third");
        assert_eq!(store.error_count(), 1);
        assert_eq!(store.warning_count(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let store = ErrorStore::new(10);
        let handle = store.clone();
        handle.add_entry(entry(ErrorLevel::Error, "shared"));
        assert_eq!(store.get_all_entries().len(), 1);

        store.clear();
        assert!(handle.get_all_entries().is_empty());
    }
}
