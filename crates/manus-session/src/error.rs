//! Error types for manus-session

use thiserror::Error;

/// Result type alias using manus-session Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a chat session
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the transport layer
    #[error(transparent)]
    Api(#[from] manus_api::Error),

    /// A chat turn is still streaming
    #[error("A turn is already in progress")]
    TurnInProgress,

    /// No agent has been created for this session yet
    #[error("No agent session; start one first")]
    NoAgent,

    /// The tool registry is incomplete or inconsistent
    #[error("Tool registry error: {0}")]
    Registry(String),
}

impl Error {
    /// Message suitable for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            Error::Api(e) => e.message(),
            other => other.to_string(),
        }
    }
}
