//! Devrun History - Service lifecycle history
//!
//! This crate provides the lifecycle log kept next to every supervised service:
//! - Event: history event types and schemas
//! - Store: bounded, sequence-numbered buckets with cursor-based reads and
//!   JSON persistence

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod store;

pub use error::{Error, Result};
pub use event::{HistoryEvent, HistoryEventType, NewHistoryEvent};
pub use store::{
    clamp_retention, default_data_dir, default_history_path, HistoryPage, ServiceHistoryStore,
    DEFAULT_RETENTION, MAX_RETENTION,
};
