//! manus-api: client for the agent backend
//!
//! This crate wraps the backend's unary JSON endpoints and its chat event
//! stream, turning framed server-sent events into typed [`StreamEvent`]s.

pub mod client;
pub mod error;
pub mod stream;
pub mod types;

pub use client::{ApiClient, ClientConfig};
pub use error::{Error, Result};
pub use stream::{EventStream, StreamEvent};
pub use types::*;
