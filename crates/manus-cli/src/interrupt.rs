//! Ctrl-C handling shared by the prompt and running turns

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::{Notify, futures::Notified};

/// Routes Ctrl-C to the running turn, if there is one
#[derive(Clone, Default)]
pub struct Interrupt {
    turn_running: Arc<AtomicBool>,
    stop_turn: Arc<Notify>,
}

impl Interrupt {
    /// Listen for Ctrl-C for the rest of the process
    ///
    /// With a turn running the signal stops it; otherwise the process exits.
    pub fn install() -> Self {
        let interrupt = Self::default();
        let listener = interrupt.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !listener.signal() {
                    eprintln!();
                    std::process::exit(130);
                }
            }
        });
        interrupt
    }

    /// Deliver one interrupt. Returns false when no turn was running.
    pub fn signal(&self) -> bool {
        if !self.turn_running.load(Ordering::Acquire) {
            return false;
        }
        self.stop_turn.notify_waiters();
        true
    }

    pub fn set_turn_running(&self, running: bool) {
        self.turn_running.store(running, Ordering::Release);
    }

    /// Resolves on the next interrupt delivered after this call
    pub fn stopped(&self) -> Notified<'_> {
        self.stop_turn.notified()
    }
}
