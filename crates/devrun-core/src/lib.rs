//! Devrun Core - Process Supervision Engine
//!
//! This crate runs one development service per (project, service) key and
//! keeps everything a viewer needs to follow it:
//! - Runner: pseudo-terminal and pipe backed child processes behind one trait
//! - Session: one live run with its transcript, viewers and inferred metadata
//! - Manager: the session registry and lifecycle state machine
//! - Signals: readiness, URL, port and warning heuristics over raw output
//! - Viewer: the message schema spoken over a viewer connection
//! - Client logs: browser console lines forwarded into a run

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ansi;
pub mod client_log;
pub mod error;
pub mod input;
pub mod manager;
pub mod ports;
pub mod runner;
pub mod runtime;
pub mod service;
pub mod session;
pub mod signals;
pub mod transcript;
pub mod viewer;

pub use client_log::{
    parse_client_log_batch, ClientLogEntry, ClientLogError, ClientLogLevel, ClientLogSource,
};
pub use devrun_history::{HistoryEvent, HistoryEventType, HistoryPage, ServiceHistoryStore};
pub use error::{Error, Result};
pub use manager::{ManagerConfig, ProcessManager, RunInfo, RunningService, StopAllReport};
pub use runner::{
    ProcessRunner, RunnerEvent, SpawnRequest, SpawnedProcess, Spawner, SystemSpawner, TerminalMode,
};
pub use runtime::{RuntimeState, ServiceStatus};
pub use session::Session;
pub use service::{ServiceKey, ServiceSpec, ServiceTarget};
pub use viewer::{ClientMessage, ViewerHandle, ViewerId, ViewerMessage};
