//! Evidence event taxonomy

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Kind of event recorded in an evidence bundle
///
/// The named variants are the baseline vocabulary; `Custom` keeps the
/// enumeration open for application-specific events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    SessionStart,
    TaskStart,
    Decision,
    ArtifactEmit,
    Warning,
    Error,
    TaskEnd,
    SessionSummary,
    Custom(String),
}

impl EventType {
    /// Wire name of the event type
    pub fn as_str(&self) -> &str {
        match self {
            EventType::SessionStart => "session_start",
            EventType::TaskStart => "task_start",
            EventType::Decision => "decision",
            EventType::ArtifactEmit => "artifact_emit",
            EventType::Warning => "warning",
            EventType::Error => "error",
            EventType::TaskEnd => "task_end",
            EventType::SessionSummary => "session_summary",
            EventType::Custom(name) => name,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "session_start" => EventType::SessionStart,
            "task_start" => EventType::TaskStart,
            "decision" => EventType::Decision,
            "artifact_emit" => EventType::ArtifactEmit,
            "warning" => EventType::Warning,
            "error" => EventType::Error,
            "task_end" => EventType::TaskEnd,
            "session_summary" => EventType::SessionSummary,
            other => EventType::Custom(other.to_string()),
        })
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
