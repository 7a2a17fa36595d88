//! Wire types exchanged with the agent backend

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unified response wrapper used by every unary endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Whether the backend reported success
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Response to agent creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Body of a chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub timestamp: i64,
}

impl ChatRequest {
    /// Build a request stamped with the current time
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellViewRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileViewRequest {
    pub file: String,
}

/// One prompt/command/output record of a shell session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleRecord {
    pub ps1: String,
    pub command: String,
    pub output: String,
}

/// Shell session snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellView {
    pub output: String,
    pub session_id: String,
    /// The backend may send `null` here
    #[serde(default, deserialize_with = "null_as_empty")]
    pub console: Vec<ConsoleRecord>,
}

/// File content snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileView {
    pub content: String,
    pub file: String,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Event payloads
// ============================================================================

/// Lifecycle status of a step, ordered from start to finish
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    /// Completed and failed steps accept no more work
    pub fn is_done(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }
}

/// Whether a tool event announces a call or reports its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Calling,
    Called,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEventData {
    #[serde(default)]
    pub timestamp: i64,
    pub name: String,
    pub function: String,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEventData {
    #[serde(default)]
    pub timestamp: i64,
    pub status: StepStatus,
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEventData {
    #[serde(default)]
    pub timestamp: i64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEventData {
    #[serde(default)]
    pub timestamp: i64,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoneEventData {
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleEventData {
    #[serde(default)]
    pub timestamp: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEventData {
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub steps: Vec<StepEventData>,
}
