//! Helper functions for store module

use std::path::PathBuf;

/// Events kept per bucket unless configured otherwise
pub const DEFAULT_RETENTION: usize = 100;

/// Upper bound for the configurable retention
pub const MAX_RETENTION: usize = 1000;

/// File name of the persisted history inside the data directory
pub(crate) const HISTORY_FILE_NAME: &str = "service-history.json";

/// Clamp a configured retention into `1..=MAX_RETENTION`
#[must_use]
pub fn clamp_retention(retention: usize) -> usize {
    retention.clamp(1, MAX_RETENTION)
}

/// Get the default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".devrun"))
        .unwrap_or_else(|| PathBuf::from(".devrun"))
}

/// Get the default history file path
pub fn default_history_path() -> PathBuf {
    default_data_dir().join(HISTORY_FILE_NAME)
}

/// Bucket key for a (project, service) pair
pub(crate) fn bucket_key(project_id: &str, service_name: &str) -> String {
    format!("{project_id}::{service_name}")
}

/// Prefix shared by every bucket of a project
pub(crate) fn project_prefix(project_id: &str) -> String {
    format!("{project_id}::")
}
