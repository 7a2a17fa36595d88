//! Folds stream events into conversation state
//!
//! The reducer performs no I/O. Events are applied in arrival order, and
//! only while a turn is active: anything delivered after `done`/`error` is
//! ignored until [`Conversation::begin_turn`] starts the next request.

use crate::conversation::{Conversation, Message, MessageContent, StepRecord, ToolInvocation, TurnState};
use manus_api::{StepEventData, StreamEvent, ToolEventData, ToolStatus};
use std::fmt;

/// An event the protocol does not allow in the current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// A tool event arrived with no pending or running step to attach to
    ToolWithoutOpenStep { function: String },
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolViolation::ToolWithoutOpenStep { function } => {
                write!(f, "tool event '{}' arrived with no open step", function)
            }
        }
    }
}

/// What applying one event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Conversation content changed
    Changed,
    /// The turn ended (`done` or `error`)
    TurnEnded,
    /// Nothing changed: no turn is active
    Ignored,
    /// The event was dropped
    Violation(ProtocolViolation),
}

impl Conversation {
    /// Start a new turn for an outgoing chat message
    ///
    /// An empty message continues the agent without adding a user entry.
    pub fn begin_turn(&mut self, message: &str, timestamp: i64) {
        if !message.is_empty() {
            self.messages.push(Message::User(MessageContent {
                content: message.to_string(),
                timestamp,
                is_error: false,
            }));
        }
        self.current_step = None;
        self.turn = TurnState::Active;
    }

    /// Close the active turn without adding content
    pub fn end_turn(&mut self) {
        if self.turn == TurnState::Active {
            self.turn = TurnState::Ended;
        }
    }

    /// Fold one event into the conversation
    pub fn apply(&mut self, event: &StreamEvent) -> Applied {
        if self.turn != TurnState::Active {
            tracing::debug!("Ignoring '{}' event outside an active turn", event.tag());
            return Applied::Ignored;
        }

        match event {
            StreamEvent::Message(data) => {
                self.messages.push(Message::Assistant(MessageContent {
                    content: data.content.clone(),
                    timestamp: data.timestamp,
                    is_error: false,
                }));
                Applied::Changed
            }
            StreamEvent::Step(data) => {
                let idx = self.upsert_step(data);
                self.current_step = Some(idx);
                Applied::Changed
            }
            StreamEvent::Plan(plan) => {
                for step in &plan.steps {
                    self.upsert_step(step);
                }
                Applied::Changed
            }
            StreamEvent::Tool(data) => self.apply_tool(data),
            StreamEvent::Error(data) => {
                self.messages.push(Message::Assistant(MessageContent {
                    content: data.error.clone(),
                    timestamp: data.timestamp,
                    is_error: true,
                }));
                self.turn = TurnState::Ended;
                Applied::TurnEnded
            }
            StreamEvent::Done(_) => {
                self.turn = TurnState::Ended;
                Applied::TurnEnded
            }
            StreamEvent::Title(data) => {
                self.title = Some(data.title.clone());
                Applied::Changed
            }
        }
    }

    /// Update the step with a matching id in place, or append a new one
    fn upsert_step(&mut self, data: &StepEventData) -> usize {
        if let Some(idx) = self.step_index(&data.id) {
            if let Some(step) = self.step_mut(idx) {
                if data.status < step.status {
                    tracing::debug!(
                        "Step {} moved back from {} to {}",
                        step.id,
                        step.status.as_str(),
                        data.status.as_str()
                    );
                }
                step.status = data.status;
                if let Some(ref description) = data.description {
                    step.description = description.clone();
                }
            }
            return idx;
        }

        self.messages.push(Message::Step(StepRecord {
            id: data.id.clone(),
            description: data.description.clone().unwrap_or_default(),
            status: data.status,
            tools: Vec::new(),
            timestamp: data.timestamp,
        }));
        self.messages.len() - 1
    }

    fn apply_tool(&mut self, data: &ToolEventData) -> Applied {
        let open = self
            .current_step
            .filter(|&idx| self.messages.get(idx).and_then(Message::as_step).is_some_and(StepRecord::is_open));

        let Some(step) = open.and_then(|idx| self.step_mut(idx)) else {
            let violation = ProtocolViolation::ToolWithoutOpenStep {
                function: data.function.clone(),
            };
            tracing::warn!("Dropping event: {}", violation);
            return Applied::Violation(violation);
        };

        // A result for the call announced just before it completes that call
        if data.status == Some(ToolStatus::Called) {
            if let Some(last) = step
                .tools
                .last_mut()
                .filter(|t| t.function == data.function && t.result.is_none())
            {
                last.result = data.result.clone();
                last.status = data.status;
                return Applied::Changed;
            }
        }

        step.tools.push(ToolInvocation::from(data));
        Applied::Changed
    }
}

/// Produce the next conversation snapshot from the current one and an event
pub fn reduce(mut state: Conversation, event: &StreamEvent) -> Conversation {
    state.apply(event);
    state
}
