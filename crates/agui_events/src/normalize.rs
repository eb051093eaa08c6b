use serde_json::Value;
use thiserror::Error;

use crate::events::AgUiEvent;

/// Discriminators decoded into typed [`AgUiEvent`] variants.
pub const KNOWN_EVENT_TYPES: &[&str] = &[
    "RUN_STARTED",
    "RUN_FINISHED",
    "RUN_ERROR",
    "STEP_STARTED",
    "STEP_FINISHED",
    "TEXT_MESSAGE_START",
    "TEXT_MESSAGE_CONTENT",
    "TEXT_MESSAGE_END",
    "TOOL_CALL_START",
    "TOOL_CALL_ARGS",
    "TOOL_CALL_END",
    "TOOL_CALL_RESULT",
    "STATE_SNAPSHOT",
    "STATE_DELTA",
    "MESSAGES_SNAPSHOT",
    "ACTIVITY_SNAPSHOT",
    "ACTIVITY_DELTA",
    "RAW",
    "META",
];

/// A record that could not be narrowed into an event. The record is skipped.
#[derive(Debug, Error)]
pub enum MalformedEvent {
    #[error("event payload is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("event payload must be a JSON object")]
    NotAnObject,
    #[error("event payload has no string `type` discriminator")]
    MissingType,
    #[error("`{event_type}` event has an unexpected shape: {source}")]
    Shape {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Narrows a raw envelope into a typed event.
///
/// Unknown discriminators are forwarded as [`AgUiEvent::Unknown`] with the full payload.
pub fn normalize_event(value: Value) -> Result<AgUiEvent, MalformedEvent> {
    if !value.is_object() {
        return Err(MalformedEvent::NotAnObject);
    }
    let event_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(MalformedEvent::MissingType)?
        .to_owned();

    if !KNOWN_EVENT_TYPES.contains(&event_type.as_str()) {
        return Ok(AgUiEvent::Unknown {
            event_type,
            payload: value,
        });
    }

    serde_json::from_value::<AgUiEvent>(value)
        .map_err(|source| MalformedEvent::Shape { event_type, source })
}

/// Parses and normalizes one JSON-encoded envelope.
pub fn normalize_str(text: &str) -> Result<AgUiEvent, MalformedEvent> {
    let value = serde_json::from_str::<Value>(text).map_err(MalformedEvent::Json)?;
    normalize_event(value)
}
