//! Transient user notifications
//!
//! A [`ToastBus`] is created once and handed to whoever needs to publish or
//! display toasts. Clones share the same channel.

use std::time::Duration;
use tokio::sync::broadcast;

/// How long a toast stays visible unless told otherwise
pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);

const BUS_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub duration: Duration,
}

impl Toast {
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
            duration: DEFAULT_DURATION,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Publish/subscribe channel for toasts
#[derive(Debug, Clone)]
pub struct ToastBus {
    sender: broadcast::Sender<Toast>,
}

impl ToastBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Publish a toast. Returns false when nobody is listening.
    pub fn show(&self, toast: Toast) -> bool {
        tracing::debug!(kind = ?toast.kind, "toast: {}", toast.message);
        self.sender.send(toast).is_ok()
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.show(Toast::new(message, ToastKind::Error))
    }

    pub fn info(&self, message: impl Into<String>) -> bool {
        self.show(Toast::new(message, ToastKind::Info))
    }

    /// Receive every toast published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.sender.subscribe()
    }
}

impl Default for ToastBus {
    fn default() -> Self {
        Self::new()
    }
}
