//! manus-session: conversation state for agent event streams
//!
//! Folds the backend's chat events into a [`Conversation`], drives a
//! [`ChatSession`] against an [`AgentBackend`], and provides the display
//! helpers (tool descriptions, relative times, locales, toasts) a front end
//! needs to show it.

pub mod conversation;
pub mod error;
pub mod locale;
pub mod reducer;
pub mod session;
pub mod subscription;
pub mod time;
pub mod toast;
pub mod tools;

pub use conversation::{Conversation, Message, MessageContent, StepRecord, ToolInvocation, TurnState};
pub use error::{Error, Result};
pub use locale::{Catalog, Locale};
pub use reducer::{Applied, ProtocolViolation, reduce};
pub use session::{AgentBackend, ChatSession};
pub use subscription::{Delivery, Subscription};
pub use time::{RelativeClock, format_relative_time};
pub use toast::{Toast, ToastBus, ToastKind};
pub use tools::{ToolInfo, ToolRegistry};
