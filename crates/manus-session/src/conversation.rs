//! Conversation state: messages, steps, tool invocations, and turn status.

use manus_api::{StepStatus, ToolEventData, ToolStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Text carried by user and assistant messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageContent {
    pub content: String,
    pub timestamp: i64,
    /// Set for messages produced from `error` events
    #[serde(default)]
    pub is_error: bool,
}

/// One call of a tool function, identified by its position in its step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool family, e.g. "shell"
    pub name: String,
    /// Operation, e.g. "shell_exec"
    pub function: String,
    pub args: Map<String, Value>,
    /// Filled in once the call has completed
    pub result: Option<Value>,
    pub status: Option<ToolStatus>,
    pub timestamp: i64,
}

impl From<&ToolEventData> for ToolInvocation {
    fn from(data: &ToolEventData) -> Self {
        Self {
            name: data.name.clone(),
            function: data.function.clone(),
            args: data.args.clone(),
            result: data.result.clone(),
            status: data.status,
            timestamp: data.timestamp,
        }
    }
}

impl ToolInvocation {
    /// Look up a string argument
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(|v| v.as_str())
    }
}

/// A server-tracked unit of agent work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: String,
    pub description: String,
    pub status: StepStatus,
    pub tools: Vec<ToolInvocation>,
    pub timestamp: i64,
}

impl StepRecord {
    /// Whether tool invocations may still attach to this step
    pub fn is_open(&self) -> bool {
        !self.status.is_done()
    }
}

/// A conversation entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum Message {
    User(MessageContent),
    Assistant(MessageContent),
    /// A tool invocation shown on its own rather than under a step
    Tool(ToolInvocation),
    Step(StepRecord),
}

impl Message {
    pub fn timestamp(&self) -> i64 {
        match self {
            Message::User(m) | Message::Assistant(m) => m.timestamp,
            Message::Tool(t) => t.timestamp,
            Message::Step(s) => s.timestamp,
        }
    }

    pub fn as_step(&self) -> Option<&StepRecord> {
        match self {
            Message::Step(step) => Some(step),
            _ => None,
        }
    }
}

/// Where the conversation is within a request/response cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// No request has been issued yet
    #[default]
    Idle,
    /// Events for the current request are expected
    Active,
    /// A `done` or `error` event (or a transport failure) closed the turn
    Ended,
}

/// Conversation state folded from the event stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation messages, in arrival order
    pub messages: Vec<Message>,
    /// Display title set by the server
    pub title: Option<String>,
    /// Turn status
    pub turn: TurnState,
    /// Index into `messages` of the most recently created or updated step
    pub(crate) current_step: Option<usize>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether events for a request are still expected
    pub fn is_streaming(&self) -> bool {
        self.turn == TurnState::Active
    }

    /// All steps, in order
    pub fn steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.messages.iter().filter_map(Message::as_step)
    }

    /// Find a step by id
    pub fn step(&self, id: &str) -> Option<&StepRecord> {
        self.steps().find(|s| s.id == id)
    }

    /// The step tool events currently attach to, if any
    pub fn current_step(&self) -> Option<&StepRecord> {
        self.current_step
            .and_then(|idx| self.messages.get(idx))
            .and_then(Message::as_step)
    }

    /// The last message, if any
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub(crate) fn step_index(&self, id: &str) -> Option<usize> {
        self.messages
            .iter()
            .position(|m| matches!(m, Message::Step(s) if s.id == id))
    }

    pub(crate) fn step_mut(&mut self, idx: usize) -> Option<&mut StepRecord> {
        match self.messages.get_mut(idx) {
            Some(Message::Step(step)) => Some(step),
            _ => None,
        }
    }
}
