//! Transport for AG-UI agentic sessions.
//!
//! [`AgUiClient`] issues the outbound commands (start run, interrupt, export) and opens
//! the Server-Sent Events push channel; [`ChannelManager`] keeps that channel alive with
//! capped exponential backoff and hands decoded events to [`ChannelHooks`]. Nothing here
//! knows what the events mean.

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod retry;
pub mod url;

pub use channel::{ChannelHooks, ChannelManager, LivenessFlag};
pub use client::AgUiClient;
pub use config::AgUiConfig;
pub use error::{parse_error_message, CommandError, TransportError};
pub use payload::{InterruptRequest, RunInputMessage, RunMetadata, StartRunRequest};
pub use retry::ReconnectPolicy;
pub use url::{session_endpoints, SessionEndpoints};
