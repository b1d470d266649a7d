//! Frozen snapshots of ended runs, evicted least-recently-ended first

use crate::runtime::RuntimeState;
use crate::service::ServiceKey;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::path::PathBuf;

/// What remains of a run after it exited
#[derive(Debug, Clone)]
pub(crate) struct RecentLog {
    pub(crate) run_id: String,
    pub(crate) transcript: String,
    pub(crate) exit_code: i32,
    pub(crate) exited_at: DateTime<Utc>,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) runtime: RuntimeState,
    pub(crate) command: String,
    pub(crate) cwd: PathBuf,
    pub(crate) exit_was_restart_replace: bool,
    pub(crate) exit_was_stop_request: bool,
}

/// Insertion-ordered map capped across all keys
#[derive(Debug)]
pub(crate) struct RecentLogs {
    entries: IndexMap<ServiceKey, RecentLog>,
    capacity: usize,
}

impl RecentLogs {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Store a snapshot as the newest entry, evicting the oldest past capacity
    pub(crate) fn insert(&mut self, key: ServiceKey, log: RecentLog) {
        self.entries.shift_remove(&key);
        self.entries.insert(key, log);
        while self.entries.len() > self.capacity {
            self.entries.shift_remove_index(0);
        }
    }

    pub(crate) fn get(&self, key: &ServiceKey) -> Option<&RecentLog> {
        self.entries.get(key)
    }

    pub(crate) fn remove(&mut self, key: &ServiceKey) -> Option<RecentLog> {
        self.entries.shift_remove(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TerminalMode;

    fn log(run_id: &str) -> RecentLog {
        RecentLog {
            run_id: run_id.to_string(),
            transcript: String::new(),
            exit_code: 0,
            exited_at: Utc::now(),
            started_at: Utc::now(),
            runtime: RuntimeState::new(TerminalMode::Pty),
            command: "true".to_string(),
            cwd: PathBuf::from("/"),
            exit_was_restart_replace: false,
            exit_was_stop_request: false,
        }
    }

    #[test]
    fn test_eviction_order() {
        let mut recent = RecentLogs::new(2);
        recent.insert(ServiceKey::new("p", "a"), log("1"));
        recent.insert(ServiceKey::new("p", "b"), log("2"));
        // Re-inserting refreshes the position of "a"
        recent.insert(ServiceKey::new("p", "a"), log("3"));
        recent.insert(ServiceKey::new("p", "c"), log("4"));

        assert_eq!(recent.len(), 2);
        assert!(recent.get(&ServiceKey::new("p", "b")).is_none());
        assert_eq!(recent.get(&ServiceKey::new("p", "a")).unwrap().run_id, "3");
        assert_eq!(recent.get(&ServiceKey::new("p", "c")).unwrap().run_id, "4");
    }

    #[test]
    fn test_remove() {
        let mut recent = RecentLogs::new(5);
        recent.insert(ServiceKey::new("p", "a"), log("1"));
        assert!(recent.remove(&ServiceKey::new("p", "a")).is_some());
        assert!(recent.remove(&ServiceKey::new("p", "a")).is_none());
    }
}
