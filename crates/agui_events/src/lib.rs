//! AG-UI protocol event types for the session conversation engine.
//!
//! This crate narrows weakly typed push-channel envelopes (`{"type": ..., ...}`) into
//! the closed [`AgUiEvent`] set and frames Server-Sent Event byte streams. It carries
//! no transport or state: malformed records surface as [`MalformedEvent`] and unknown
//! discriminators pass through as [`AgUiEvent::Unknown`].

pub mod events;
pub mod normalize;
pub mod sse;
pub mod types;

pub use events::AgUiEvent;
pub use normalize::{normalize_event, normalize_str, MalformedEvent, KNOWN_EVENT_TYPES};
pub use sse::SseStreamParser;
pub use types::{Activity, ActivityPatch, Role, WireFunction, WireMessage, WireToolCall};
