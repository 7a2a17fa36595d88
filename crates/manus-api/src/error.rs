//! Error types for manus-api

use thiserror::Error;

/// Result type alias using manus-api Error
pub type Result<T> = std::result::Result<T, Error>;

/// Code reported for failures where no response was received
pub const NETWORK_ERROR_CODE: i64 = 503;

/// Errors that can occur when talking to the agent backend
#[derive(Error, Debug)]
pub enum Error {
    /// Well-formed envelope carrying a non-zero code
    #[error("{msg} (code: {code})")]
    Business { code: i64, msg: String },

    /// Backend answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// No response was received at all
    #[error("Network error, please check your connection: {0}")]
    Network(String),

    /// The event-stream connection failed
    #[error("Event stream error: {0}")]
    Stream(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Request was cancelled by the caller
    #[error("Request aborted")]
    Aborted,
}

impl Error {
    /// Create a business error from an envelope code and message
    pub fn business(code: i64, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        Self::Business {
            code,
            msg: if msg.is_empty() {
                "Unknown error".to_string()
            } else {
                msg
            },
        }
    }

    /// Classify a reqwest failure that happened before any response arrived
    pub fn from_transport(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string(),
            },
            None => Self::Network(err.to_string()),
        }
    }

    /// The user-facing message, without the code decoration
    pub fn message(&self) -> String {
        match self {
            Error::Business { msg, .. } => msg.clone(),
            Error::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Numeric code as the backend contract reports it
    ///
    /// Business errors carry their envelope code, HTTP errors their status,
    /// and a missing response maps to 503.
    pub fn code(&self) -> Option<i64> {
        match self {
            Error::Business { code, .. } => Some(*code),
            Error::Http { status, .. } => Some(i64::from(*status)),
            Error::Network(_) => Some(NETWORK_ERROR_CODE),
            _ => None,
        }
    }

    /// Whether no response was received
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    /// Whether this error ended an event stream
    pub fn is_stream_failure(&self) -> bool {
        matches!(self, Error::Stream(_) | Error::Http { .. } | Error::Network(_))
    }
}
