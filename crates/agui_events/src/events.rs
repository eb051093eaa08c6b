use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Activity, ActivityPatch, Role, WireMessage};

/// Normalized protocol event consumed by the conversation reducer.
///
/// Wire names follow AG-UI (`RUN_STARTED`, `TOOL_CALL_ARGS`, ...) with camelCase fields.
/// `RAW` and `META` envelopes keep their payloads opaque; anything else the normalizer
/// does not recognise arrives as [`AgUiEvent::Unknown`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgUiEvent {
    #[serde(rename = "RUN_STARTED", rename_all = "camelCase")]
    RunStarted {
        thread_id: String,
        run_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_run_id: Option<String>,
    },
    #[serde(rename = "RUN_FINISHED", rename_all = "camelCase")]
    RunFinished {
        #[serde(default)]
        thread_id: String,
        #[serde(default)]
        run_id: String,
    },
    #[serde(rename = "RUN_ERROR")]
    RunError {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    #[serde(rename = "STEP_STARTED", rename_all = "camelCase")]
    StepStarted { step_name: String },
    #[serde(rename = "STEP_FINISHED", rename_all = "camelCase")]
    StepFinished { step_name: String },

    #[serde(rename = "TEXT_MESSAGE_START", rename_all = "camelCase")]
    TextMessageStart {
        message_id: String,
        #[serde(default)]
        role: Role,
    },
    #[serde(rename = "TEXT_MESSAGE_CONTENT", rename_all = "camelCase")]
    TextMessageContent { message_id: String, delta: String },
    #[serde(rename = "TEXT_MESSAGE_END", rename_all = "camelCase")]
    TextMessageEnd { message_id: String },

    #[serde(rename = "TOOL_CALL_START", rename_all = "camelCase")]
    ToolCallStart {
        tool_call_id: String,
        #[serde(default)]
        tool_call_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<String>,
        /// Explicit parent tool call, set for sub-agent invocations.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_tool_use_id: Option<String>,
    },
    #[serde(rename = "TOOL_CALL_ARGS", rename_all = "camelCase")]
    ToolCallArgs { tool_call_id: String, delta: String },
    #[serde(rename = "TOOL_CALL_END", rename_all = "camelCase")]
    ToolCallEnd { tool_call_id: String },
    #[serde(rename = "TOOL_CALL_RESULT", rename_all = "camelCase")]
    ToolCallResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        tool_call_id: String,
        #[serde(default, deserialize_with = "crate::events::content_text")]
        content: String,
        #[serde(default)]
        is_error: bool,
    },

    #[serde(rename = "STATE_SNAPSHOT")]
    StateSnapshot { snapshot: Value },
    #[serde(rename = "STATE_DELTA")]
    StateDelta { delta: Vec<Value> },
    #[serde(rename = "MESSAGES_SNAPSHOT")]
    MessagesSnapshot { messages: Vec<WireMessage> },
    #[serde(rename = "ACTIVITY_SNAPSHOT")]
    ActivitySnapshot { activities: Vec<Activity> },
    #[serde(rename = "ACTIVITY_DELTA")]
    ActivityDelta { delta: Vec<ActivityPatch> },

    /// Opaque payload forwarded from the runner (thinking blocks, user echoes, trace ids).
    #[serde(rename = "RAW")]
    Raw {
        event: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    /// Out-of-band control signal, e.g. feedback annotations.
    #[serde(rename = "META", rename_all = "camelCase")]
    Meta {
        meta_type: String,
        #[serde(default)]
        payload: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ts: Option<Value>,
    },
    /// Event type retained for forward-compatible passthrough.
    #[serde(rename = "unknown")]
    Unknown { event_type: String, payload: Value },
}

impl AgUiEvent {
    /// Wire discriminator for this event.
    pub fn event_type(&self) -> &str {
        match self {
            Self::RunStarted { .. } => "RUN_STARTED",
            Self::RunFinished { .. } => "RUN_FINISHED",
            Self::RunError { .. } => "RUN_ERROR",
            Self::StepStarted { .. } => "STEP_STARTED",
            Self::StepFinished { .. } => "STEP_FINISHED",
            Self::TextMessageStart { .. } => "TEXT_MESSAGE_START",
            Self::TextMessageContent { .. } => "TEXT_MESSAGE_CONTENT",
            Self::TextMessageEnd { .. } => "TEXT_MESSAGE_END",
            Self::ToolCallStart { .. } => "TOOL_CALL_START",
            Self::ToolCallArgs { .. } => "TOOL_CALL_ARGS",
            Self::ToolCallEnd { .. } => "TOOL_CALL_END",
            Self::ToolCallResult { .. } => "TOOL_CALL_RESULT",
            Self::StateSnapshot { .. } => "STATE_SNAPSHOT",
            Self::StateDelta { .. } => "STATE_DELTA",
            Self::MessagesSnapshot { .. } => "MESSAGES_SNAPSHOT",
            Self::ActivitySnapshot { .. } => "ACTIVITY_SNAPSHOT",
            Self::ActivityDelta { .. } => "ACTIVITY_DELTA",
            Self::Raw { .. } => "RAW",
            Self::Meta { .. } => "META",
            Self::Unknown { event_type, .. } => event_type,
        }
    }

    /// Returns true for events that end the active run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunFinished { .. } | Self::RunError { .. })
    }

    /// Trace identifier carried by a raw payload, if any.
    pub fn trace_id(&self) -> Option<&str> {
        let Self::Raw { event, .. } = self else {
            return None;
        };
        ["traceId", "langfuseTraceId", "trace_id"]
            .iter()
            .find_map(|key| event.get(*key).and_then(Value::as_str))
            .filter(|value| !value.trim().is_empty())
    }

    pub fn run_started(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self::RunStarted {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            parent_run_id: None,
        }
    }

    pub fn run_finished(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self::RunFinished {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
        }
    }

    pub fn text_start(message_id: impl Into<String>) -> Self {
        Self::TextMessageStart {
            message_id: message_id.into(),
            role: Role::Assistant,
        }
    }

    pub fn text_content(message_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::TextMessageContent {
            message_id: message_id.into(),
            delta: delta.into(),
        }
    }

    pub fn text_end(message_id: impl Into<String>) -> Self {
        Self::TextMessageEnd {
            message_id: message_id.into(),
        }
    }

    pub fn tool_start(
        tool_call_id: impl Into<String>,
        tool_call_name: impl Into<String>,
        parent_message_id: Option<String>,
    ) -> Self {
        Self::ToolCallStart {
            tool_call_id: tool_call_id.into(),
            tool_call_name: tool_call_name.into(),
            parent_message_id,
            parent_tool_use_id: None,
        }
    }

    pub fn tool_args(tool_call_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::ToolCallArgs {
            tool_call_id: tool_call_id.into(),
            delta: delta.into(),
        }
    }

    pub fn tool_end(tool_call_id: impl Into<String>) -> Self {
        Self::ToolCallEnd {
            tool_call_id: tool_call_id.into(),
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolCallResult {
            message_id: None,
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }
}

pub(crate) fn content_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(crate::types::text_from_value).unwrap_or_default())
}
