//! Chat session driver
//!
//! Owns the conversation for one agent and feeds it events from the backend.

use async_trait::async_trait;
use manus_api::{Agent, ApiClient, EventStream, FileView, ShellView, StreamEvent};

use crate::conversation::Conversation;
use crate::error::{Error, Result};
use crate::reducer::Applied;
use crate::subscription::{Delivery, Subscription};
use crate::time::now_secs;
use crate::toast::ToastBus;
use tokio_util::sync::CancellationToken;

/// The backend operations a chat session needs
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Create a fresh agent
    async fn create_agent(&self) -> manus_api::Result<Agent>;

    /// Send a chat message and stream the agent's reply
    async fn chat(&self, agent_id: &str, message: &str) -> manus_api::Result<EventStream>;

    async fn view_shell(&self, agent_id: &str, session_id: &str) -> manus_api::Result<ShellView>;

    async fn view_file(&self, agent_id: &str, file: &str) -> manus_api::Result<FileView>;

    /// WebSocket URL of the agent's remote desktop
    fn vnc_url(&self, agent_id: &str) -> String;
}

#[async_trait]
impl AgentBackend for ApiClient {
    async fn create_agent(&self) -> manus_api::Result<Agent> {
        ApiClient::create_agent(self).await
    }

    async fn chat(&self, agent_id: &str, message: &str) -> manus_api::Result<EventStream> {
        ApiClient::chat(self, agent_id, message)
    }

    async fn view_shell(&self, agent_id: &str, session_id: &str) -> manus_api::Result<ShellView> {
        ApiClient::view_shell(self, agent_id, session_id).await
    }

    async fn view_file(&self, agent_id: &str, file: &str) -> manus_api::Result<FileView> {
        ApiClient::view_file(self, agent_id, file).await
    }

    fn vnc_url(&self, agent_id: &str) -> String {
        ApiClient::vnc_url(self, agent_id)
    }
}

/// A conversation with one agent
pub struct ChatSession<B: AgentBackend> {
    backend: B,
    agent_id: Option<String>,
    conversation: Conversation,
    toasts: Option<ToastBus>,
    /// Closes with the subscription of the active turn
    active: Option<CancellationToken>,
}

impl<B: AgentBackend> ChatSession<B> {
    /// Create a session with no agent yet; call [`ChatSession::start`]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            agent_id: None,
            conversation: Conversation::new(),
            toasts: None,
            active: None,
        }
    }

    /// Resume an existing agent
    pub fn with_agent(backend: B, agent_id: impl Into<String>) -> Self {
        let mut session = Self::new(backend);
        session.agent_id = Some(agent_id.into());
        session
    }

    /// Publish failures to this bus
    pub fn with_toasts(mut self, toasts: ToastBus) -> Self {
        self.toasts = Some(toasts);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Whether a turn is active and its subscription is still open
    pub fn is_streaming(&self) -> bool {
        self.conversation.is_streaming()
            && self.active.as_ref().is_some_and(|token| !token.is_cancelled())
    }

    /// Create a new agent and start an empty conversation with it
    pub async fn start(&mut self) -> Result<Agent> {
        let agent = match self.backend.create_agent().await {
            Ok(agent) => agent,
            Err(e) => return Err(self.report(e.into())),
        };
        tracing::info!(agent_id = %agent.agent_id, "agent created");
        self.agent_id = Some(agent.agent_id.clone());
        self.conversation = Conversation::new();
        self.active = None;
        Ok(agent)
    }

    /// Begin a turn and open its event stream
    ///
    /// Deliveries from the returned subscription must be passed back through
    /// [`ChatSession::handle`]. Fails with [`Error::TurnInProgress`] while
    /// the previous turn is still streaming. Dropping or closing the
    /// subscription ends its turn.
    pub async fn send(&mut self, message: &str) -> Result<Subscription> {
        if self.is_streaming() {
            return Err(Error::TurnInProgress);
        }
        if self.conversation.is_streaming() {
            tracing::debug!("previous subscription closed mid-turn");
            self.end_turn();
        }
        let agent_id = self.agent_id.clone().ok_or(Error::NoAgent)?;

        self.conversation.begin_turn(message, now_secs());
        tracing::debug!(agent_id = %agent_id, "sending chat message");

        match self.backend.chat(&agent_id, message).await {
            Ok(stream) => {
                let subscription = Subscription::spawn(stream);
                self.active = Some(subscription.cancel_token());
                Ok(subscription)
            }
            Err(e) => {
                self.end_turn();
                Err(self.report(e.into()))
            }
        }
    }

    /// Fold one delivery into the conversation
    ///
    /// A failed delivery ends the turn and is returned as an error.
    pub fn handle(&mut self, delivery: Delivery) -> Result<Applied> {
        match delivery {
            Delivery::Event(event) => Ok(self.conversation.apply(&event)),
            Delivery::Failed(e) => {
                self.end_turn();
                Err(self.report(e.into()))
            }
        }
    }

    /// Mark the active turn finished, e.g. when its stream closed early
    pub fn end_turn(&mut self) {
        self.conversation.end_turn();
        self.active = None;
    }

    /// Abandon the active turn, if any
    pub fn cancel_turn(&mut self, subscription: &mut Subscription) {
        subscription.close();
        self.end_turn();
    }

    /// Send a message and drive its stream to the end
    ///
    /// `on_update` sees the conversation after each event is applied.
    pub async fn run_turn<F>(&mut self, message: &str, mut on_update: F) -> Result<()>
    where
        F: FnMut(&Conversation, &StreamEvent),
    {
        let mut subscription = self.send(message).await?;

        while let Some(delivery) = subscription.next().await {
            let event = match &delivery {
                Delivery::Event(event) => Some(event.clone()),
                Delivery::Failed(_) => None,
            };
            self.handle(delivery)?;
            if let Some(event) = event {
                on_update(&self.conversation, &event);
            }
        }

        // Stream closed without done/error
        self.end_turn();
        Ok(())
    }

    pub async fn view_shell(&self, session_id: &str) -> Result<ShellView> {
        let agent_id = self.agent_id.as_deref().ok_or(Error::NoAgent)?;
        Ok(self.backend.view_shell(agent_id, session_id).await?)
    }

    pub async fn view_file(&self, file: &str) -> Result<FileView> {
        let agent_id = self.agent_id.as_deref().ok_or(Error::NoAgent)?;
        Ok(self.backend.view_file(agent_id, file).await?)
    }

    pub fn vnc_url(&self) -> Result<String> {
        let agent_id = self.agent_id.as_deref().ok_or(Error::NoAgent)?;
        Ok(self.backend.vnc_url(agent_id))
    }

    fn report(&self, error: Error) -> Error {
        tracing::warn!("chat session error: {}", error);
        if let Some(toasts) = &self.toasts {
            toasts.error(error.user_message());
        }
        error
    }
}
