use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Push-channel failure. Retried by the channel manager and never returned to callers.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("event stream closed by server")]
    StreamEnded,
}

/// Failure of an outbound start-run / interrupt / export command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("start-run response did not include a run id")]
    MissingRunId,
    #[error(transparent)]
    Export(#[from] event_log::EventLogError),
}

impl CommandError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(error) => error.status(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<Value>,
    message: Option<String>,
}

/// Extract a human-readable message from an HTTP error body.
///
/// Accepts `{"error": "..."}`, `{"error": {"message": "..."}}` and `{"message": "..."}`;
/// anything else falls back to the raw body, then the canonical reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        let from_error = payload.error.as_ref().and_then(|value| match value {
            Value::String(text) => non_empty(text),
            Value::Object(fields) => fields
                .get("message")
                .and_then(Value::as_str)
                .and_then(non_empty),
            _ => None,
        });
        if let Some(message) = from_error.or_else(|| payload.message.as_deref().and_then(non_empty))
        {
            return message.to_owned();
        }
    }

    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_and_object_error_shapes_are_supported() {
        assert_eq!(
            parse_error_message(StatusCode::CONFLICT, r#"{"error":"run already active"}"#),
            "run already active"
        );
        assert_eq!(
            parse_error_message(
                StatusCode::BAD_REQUEST,
                r#"{"error":{"message":"threadId is required"}}"#
            ),
            "threadId is required"
        );
    }

    #[test]
    fn falls_back_to_body_then_reason() {
        assert_eq!(
            parse_error_message(StatusCode::BAD_GATEWAY, "upstream unavailable"),
            "upstream unavailable"
        );
        assert_eq!(
            parse_error_message(StatusCode::NOT_FOUND, ""),
            "Not Found"
        );
        assert_eq!(
            parse_error_message(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":""}"#),
            r#"{"error":""}"#
        );
    }
}
