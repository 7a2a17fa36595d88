//! A cancellable event-stream subscription tied to its owner's lifetime.

use futures::StreamExt;
use manus_api::{EventStream, StreamEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Buffered deliveries between the stream task and the owner
const CHANNEL_CAPACITY: usize = 64;

/// Something the subscription hands to its owner
#[derive(Debug)]
pub enum Delivery {
    /// A decoded event, in server order
    Event(StreamEvent),
    /// The stream failed; nothing follows this
    Failed(manus_api::Error),
}

/// One streaming connection, driven on a background task
///
/// Dropping the subscription closes it. After [`Subscription::close`]
/// returns, no further delivery is observed.
pub struct Subscription {
    cancel: CancellationToken,
    receiver: mpsc::Receiver<Delivery>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Start driving a stream. Must be called within a tokio runtime.
    pub fn spawn(mut stream: EventStream) -> Self {
        let cancel = CancellationToken::new();
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::debug!("Subscription cancelled");
                        break;
                    }
                    item = stream.next() => item,
                };

                let delivery = match item {
                    Some(Ok(event)) => Delivery::Event(event),
                    Some(Err(e)) => Delivery::Failed(e),
                    None => break,
                };
                let failed = matches!(delivery, Delivery::Failed(_));

                if sender.send(delivery).await.is_err() {
                    // Owner went away
                    break;
                }
                if failed {
                    break;
                }
            }
            // Dropping the stream here closes the connection
        });

        Self {
            cancel,
            receiver,
            task: Some(task),
        }
    }

    /// Wait for the next delivery; `None` once the stream ended or was closed
    pub async fn next(&mut self) -> Option<Delivery> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            delivery = self.receiver.recv() => delivery,
        }
    }

    /// Close the connection and suppress any further delivery
    pub fn close(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.receiver.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether [`Subscription::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A token that closes this subscription when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
