//! Typed events carried by the chat event stream

use crate::error::Result;
use crate::types::{
    DoneEventData, ErrorEventData, MessageEventData, PlanEventData, StepEventData, TitleEventData,
    ToolEventData,
};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// One decoded `event:`/`data:` frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A tool is being called, or reports its result
    Tool(ToolEventData),
    /// A step was created or changed status
    Step(StepEventData),
    /// Assistant text
    Message(MessageEventData),
    /// The turn failed
    Error(ErrorEventData),
    /// The turn finished
    Done(DoneEventData),
    /// The conversation got a display title
    Title(TitleEventData),
    /// Snapshot of the plan's steps
    Plan(PlanEventData),
}

impl StreamEvent {
    /// Decode a frame's event name and JSON payload
    ///
    /// Returns `Ok(None)` for frames that carry no event name (keep-alives,
    /// comments) and for tags this client does not know.
    pub fn from_frame(event: &str, data: &str) -> Result<Option<Self>> {
        let tag = event.trim();
        if tag.is_empty() {
            return Ok(None);
        }

        let parsed = match tag {
            "tool" => StreamEvent::Tool(serde_json::from_str(data)?),
            "step" => StreamEvent::Step(serde_json::from_str(data)?),
            "message" => StreamEvent::Message(serde_json::from_str(data)?),
            "error" => StreamEvent::Error(serde_json::from_str(data)?),
            "done" => StreamEvent::Done(parse_or_default(data)?),
            "title" => StreamEvent::Title(serde_json::from_str(data)?),
            "plan" => StreamEvent::Plan(serde_json::from_str(data)?),
            other => {
                tracing::debug!("Ignoring unknown event tag: {}", other);
                return Ok(None);
            }
        };

        Ok(Some(parsed))
    }

    /// The wire tag of this event
    pub fn tag(&self) -> &'static str {
        match self {
            StreamEvent::Tool(_) => "tool",
            StreamEvent::Step(_) => "step",
            StreamEvent::Message(_) => "message",
            StreamEvent::Error(_) => "error",
            StreamEvent::Done(_) => "done",
            StreamEvent::Title(_) => "title",
            StreamEvent::Plan(_) => "plan",
        }
    }

    /// Server timestamp of the event (epoch seconds)
    pub fn timestamp(&self) -> i64 {
        match self {
            StreamEvent::Tool(d) => d.timestamp,
            StreamEvent::Step(d) => d.timestamp,
            StreamEvent::Message(d) => d.timestamp,
            StreamEvent::Error(d) => d.timestamp,
            StreamEvent::Done(d) => d.timestamp,
            StreamEvent::Title(d) => d.timestamp,
            StreamEvent::Plan(d) => d.timestamp,
        }
    }

    /// Check if this event ends the turn (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done(_) | StreamEvent::Error(_))
    }
}

/// `done` frames may arrive with an empty data line
fn parse_or_default(data: &str) -> Result<DoneEventData> {
    if data.trim().is_empty() {
        return Ok(DoneEventData { timestamp: 0 });
    }
    Ok(serde_json::from_str(data)?)
}

/// A stream of decoded chat events; ends after a terminal event or failure
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepStatus;

    #[test]
    fn test_empty_tag_is_dropped() {
        assert!(StreamEvent::from_frame("", "{}").unwrap().is_none());
        assert!(StreamEvent::from_frame("   ", "garbage").unwrap().is_none());
    }

    #[test]
    fn test_unknown_tag_is_dropped() {
        assert!(StreamEvent::from_frame("ping", "{}").unwrap().is_none());
    }

    #[test]
    fn test_step_frame() {
        let event = StreamEvent::from_frame(
            "step",
            r#"{"timestamp":10,"status":"running","id":"s1","description":"do X"}"#,
        )
        .unwrap()
        .unwrap();
        match &event {
            StreamEvent::Step(step) => {
                assert_eq!(step.id, "s1");
                assert_eq!(step.status, StepStatus::Running);
                assert_eq!(step.description.as_deref(), Some("do X"));
            }
            other => panic!("expected step, got {:?}", other),
        }
        assert_eq!(event.timestamp(), 10);
        assert_eq!(event.tag(), "step");
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_tag_whitespace_is_trimmed() {
        let event = StreamEvent::from_frame(" title ", r#"{"title":"Trip plan"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.tag(), "title");
    }

    #[test]
    fn test_done_with_empty_data() {
        let event = StreamEvent::from_frame("done", "").unwrap().unwrap();
        assert!(event.is_terminal());
    }

    #[test]
    fn test_error_is_terminal() {
        let event = StreamEvent::from_frame("error", r#"{"timestamp":1,"error":"boom"}"#)
            .unwrap()
            .unwrap();
        assert!(event.is_terminal());
    }

    #[test]
    fn test_bad_payload_is_an_error() {
        assert!(StreamEvent::from_frame("message", "not json").is_err());
        assert!(StreamEvent::from_frame("step", r#"{"id":"s1"}"#).is_err());
    }

    #[test]
    fn test_plan_frame() {
        let data = r#"{"steps":[{"status":"pending","id":"1","description":"a"},{"status":"pending","id":"2","description":"b"}]}"#;
        match StreamEvent::from_frame("plan", data).unwrap().unwrap() {
            StreamEvent::Plan(plan) => assert_eq!(plan.steps.len(), 2),
            other => panic!("expected plan, got {:?}", other),
        }
    }
}
