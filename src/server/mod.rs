//! Server module for devrun
//!
//! Contains the main server initialization and runtime logic.
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for all server components
//! - `loader`: Configuration loading from files and environment
//! - `catalog`: Project/service validation and resolution
//! - `shutdown`: Signal handling
//! - `init`: Main server initialization and run loop

pub mod catalog;
pub mod config;
mod init;
mod loader;
mod shutdown;

// Re-export public API
pub use init::{build_router, run, ServeOptions};
pub use loader::load_config;
