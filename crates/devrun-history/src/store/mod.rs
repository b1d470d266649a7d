//! Store - Bounded per-service history with JSON persistence
//!
//! Every (project, service) pair owns one bucket. Buckets are created on first
//! append, trimmed to the configured retention and written to a single JSON
//! file after every change.

mod bucket;
mod helpers;
mod history_store;
mod persist;


pub use helpers::{
    clamp_retention, default_data_dir, default_history_path, DEFAULT_RETENTION, MAX_RETENTION,
};
pub use history_store::{HistoryPage, ServiceHistoryStore};
