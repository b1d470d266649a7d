//! Event - Lifecycle event types recorded per service
//!
//! Events are append-only. Each (project, service) bucket numbers its own
//! events starting at 1; numbers are never reused, even after old events are
//! trimmed away by retention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventType {
    /// A new run was spawned
    Start,
    /// An operator asked the run to stop
    StopRequested,
    /// An operator asked for the service to be restarted
    RestartRequested,
    /// A line typed into the terminal was reconstructed
    StdinCommand,
    /// The run ended
    Exit,
    /// A browser attached to the run forwarded a log line
    ClientLog,
}

impl HistoryEventType {
    /// Returns the string representation of the event type
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::StopRequested => "stop_requested",
            Self::RestartRequested => "restart_requested",
            Self::StdinCommand => "stdin_command",
            Self::Exit => "exit",
            Self::ClientLog => "client_log",
        }
    }
}

impl std::fmt::Display for HistoryEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HistoryEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "stop_requested" => Ok(Self::StopRequested),
            "restart_requested" => Ok(Self::RestartRequested),
            "stdin_command" => Ok(Self::StdinCommand),
            "exit" => Ok(Self::Exit),
            "client_log" => Ok(Self::ClientLog),
            _ => Err(format!("unknown history event type: {s}")),
        }
    }
}

/// A stored history event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    /// Per-bucket sequence number
    pub seq: u64,
    /// When the event was appended
    pub ts: DateTime<Utc>,
    /// Owning project
    pub project_id: String,
    /// Owning service
    pub service_name: String,
    /// Run the event belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// Event type
    #[serde(rename = "type")]
    pub event_type: HistoryEventType,
    /// Structured payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// An event waiting to be appended; the store assigns `seq` and `ts`
#[derive(Debug, Clone)]
pub struct NewHistoryEvent {
    /// Owning project
    pub project_id: String,
    /// Owning service
    pub service_name: String,
    /// Run the event belongs to, if any
    pub run_id: Option<String>,
    /// Event type
    pub event_type: HistoryEventType,
    /// Structured payload
    pub data: Option<serde_json::Value>,
}

impl NewHistoryEvent {
    /// Create a new event for a service
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        service_name: impl Into<String>,
        event_type: HistoryEventType,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            service_name: service_name.into(),
            run_id: None,
            event_type,
            data: None,
        }
    }

    /// Attach the run id
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Attach a structured payload
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub(crate) fn into_event(self, seq: u64, ts: DateTime<Utc>) -> HistoryEvent {
        HistoryEvent {
            seq,
            ts,
            project_id: self.project_id,
            service_name: self.service_name,
            run_id: self.run_id,
            event_type: self.event_type,
            data: self.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_roundtrip() {
        for ty in [
            HistoryEventType::Start,
            HistoryEventType::StopRequested,
            HistoryEventType::RestartRequested,
            HistoryEventType::StdinCommand,
            HistoryEventType::Exit,
            HistoryEventType::ClientLog,
        ] {
            let parsed: HistoryEventType = ty.as_str().parse().unwrap();
            assert_eq!(parsed, ty);
        }
        assert!("crash".parse::<HistoryEventType>().is_err());
    }

    #[test]
    fn test_event_wire_shape() {
        let event = NewHistoryEvent::new("web", "api", HistoryEventType::StdinCommand)
            .with_run_id("run-1")
            .with_data(serde_json::json!({ "command": "echo hi" }))
            .into_event(3, Utc::now());

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["seq"], 3);
        assert_eq!(value["projectId"], "web");
        assert_eq!(value["serviceName"], "api");
        assert_eq!(value["runId"], "run-1");
        assert_eq!(value["type"], "stdin_command");
        assert_eq!(value["data"]["command"], "echo hi");
    }

    #[test]
    fn test_optional_fields_omitted() {
        let event =
            NewHistoryEvent::new("web", "api", HistoryEventType::RestartRequested).into_event(1, Utc::now());
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("runId").is_none());
        assert!(value.get("data").is_none());
    }
}
