//! Server configuration types
//!
//! Contains all configuration structures for the devrun server.

use devrun_core::ManagerConfig;
use devrun_history::{clamp_retention, default_data_dir, DEFAULT_RETENTION};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

impl AppConfig {
    /// Resolved data directory
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(default_data_dir)
    }

    /// Resolved history file
    pub fn history_path(&self) -> PathBuf {
        match self.history.path.as_deref() {
            Some(path) => expand_home(path),
            None => self.data_dir().join("service-history.json"),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4317,
        }
    }
}

/// Process supervision tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Shell used as `<shell> -lc <cmd>`; `$SHELL` when unset
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
    #[serde(default = "default_ready_grace_ms")]
    pub ready_grace_ms: u64,
    #[serde(default = "default_max_log_chars")]
    pub max_log_chars: usize,
    #[serde(default = "default_max_recent_logs")]
    pub max_recent_logs: usize,
    #[serde(default = "default_strip_env")]
    pub strip_env: Vec<String>,
    #[serde(default = "default_pty_cols")]
    pub pty_cols: u16,
    #[serde(default = "default_pty_rows")]
    pub pty_rows: u16,
}

fn default_stop_grace_ms() -> u64 {
    1200
}

fn default_ready_grace_ms() -> u64 {
    2500
}

fn default_max_log_chars() -> usize {
    120_000
}

fn default_max_recent_logs() -> usize {
    100
}

fn default_strip_env() -> Vec<String> {
    vec!["PORT".to_string()]
}

fn default_pty_cols() -> u16 {
    120
}

fn default_pty_rows() -> u16 {
    32
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            shell: None,
            stop_grace_ms: default_stop_grace_ms(),
            ready_grace_ms: default_ready_grace_ms(),
            max_log_chars: default_max_log_chars(),
            max_recent_logs: default_max_recent_logs(),
            strip_env: default_strip_env(),
            pty_cols: default_pty_cols(),
            pty_rows: default_pty_rows(),
        }
    }
}

impl SupervisorConfig {
    /// Build the manager configuration
    pub fn to_manager_config(&self) -> ManagerConfig {
        let defaults = ManagerConfig::default();
        ManagerConfig {
            shell: self
                .shell
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.shell),
            stop_grace: Duration::from_millis(self.stop_grace_ms),
            ready_grace: Duration::from_millis(self.ready_grace_ms),
            max_log_chars: self.max_log_chars.max(1),
            max_recent_logs: self.max_recent_logs.max(1),
            strip_env: self.strip_env.clone(),
            pty_cols: self.pty_cols,
            pty_rows: self.pty_rows,
            port_release_timeout: defaults.port_release_timeout,
        }
    }
}

/// History store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_retention")]
    pub retention: usize,
    #[serde(default)]
    pub path: Option<String>,
}

fn default_retention() -> usize {
    DEFAULT_RETENTION
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
            path: None,
        }
    }
}

impl HistoryConfig {
    /// Retention clamped to the supported range
    pub fn effective_retention(&self) -> usize {
        clamp_retention(self.retention)
    }
}

/// One configured project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub root: String,
    #[serde(default)]
    pub default_service: Option<String>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

/// One service within a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub cmd: String,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
