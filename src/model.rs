use std::collections::BTreeMap;
use std::sync::Arc;

use agui_events::{Activity, Role, WireMessage, WireToolCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool names that carry no information and may be replaced by a better one.
pub const PLACEHOLDER_TOOL_NAMES: &[&str] = &["", "tool", "unknown", "unknown_tool"];

pub fn is_placeholder_name(name: &str) -> bool {
    PLACEHOLDER_TOOL_NAMES.contains(&name.trim())
}

pub fn is_placeholder_arguments(arguments: &str) -> bool {
    matches!(arguments.trim(), "" | "{}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Error,
}

impl ToolCallStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Completed | Self::Error => 2,
        }
    }

    /// Moves towards `next` unless that would lower the rank.
    #[must_use]
    pub fn advance(self, next: Self) -> Self {
        if next.rank() >= self.rank() {
            next
        } else {
            self
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }

    fn from_wire(value: Option<&str>) -> Option<Self> {
        match value?.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" | "in_progress" => Some(Self::Running),
            "completed" | "complete" | "success" => Some(Self::Completed),
            "error" | "failed" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: String::new(),
            result: None,
            status: ToolCallStatus::Pending,
            parent_tool_use_id: None,
        }
    }

    pub fn set_status(&mut self, next: ToolCallStatus) {
        self.status = self.status.advance(next);
    }

    /// Records a result; errors win over a prior completion.
    pub fn complete(&mut self, result: impl Into<String>, is_error: bool) {
        self.result = Some(result.into());
        self.set_status(if is_error {
            ToolCallStatus::Error
        } else {
            ToolCallStatus::Completed
        });
    }
}

impl From<WireToolCall> for ToolCall {
    fn from(call: WireToolCall) -> Self {
        let status = ToolCallStatus::from_wire(call.status.as_deref()).unwrap_or(
            if call.result.is_some() {
                ToolCallStatus::Completed
            } else {
                ToolCallStatus::Pending
            },
        );
        Self {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
            result: call.result,
            status,
            parent_tool_use_id: call.parent_tool_use_id,
        }
    }
}

/// Committed conversation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            timestamp: None,
            name: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, Role::User, content)
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, Role::Assistant, content)
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn tool_call(&self, id: &str) -> Option<&ToolCall> {
        self.tool_calls.iter().find(|call| call.id == id)
    }

    pub fn tool_call_mut(&mut self, id: &str) -> Option<&mut ToolCall> {
        self.tool_calls.iter_mut().find(|call| call.id == id)
    }

    /// Top-level tool calls, i.e. those without a parent on this message.
    pub fn root_tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.tool_calls.iter().filter(|call| {
            call.parent_tool_use_id
                .as_deref()
                .map_or(true, |parent| self.tool_call(parent).is_none())
        })
    }

    pub fn child_tool_calls<'a>(&'a self, parent_id: &'a str) -> impl Iterator<Item = &'a ToolCall> {
        self.tool_calls
            .iter()
            .filter(move |call| call.parent_tool_use_id.as_deref() == Some(parent_id))
    }

    pub(crate) fn is_standalone_tool(&self) -> bool {
        self.role == Role::Tool
    }
}

impl From<WireMessage> for Message {
    fn from(message: WireMessage) -> Self {
        Self {
            id: message.id,
            role: message.role,
            content: message.content,
            timestamp: message.timestamp,
            name: message.name,
            tool_call_id: message.tool_call_id,
            tool_calls: message.tool_calls.into_iter().map(ToolCall::from).collect(),
        }
    }
}

/// In-flight streaming text. Replaced, never mutated, on every delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
}

/// Tool call whose start has been seen but whose end has not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
    pub parent_tool_use_id: Option<String>,
    pub parent_message_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    ThumbsUp,
    ThumbsDown,
}

impl FeedbackKind {
    pub fn from_meta_type(meta_type: &str) -> Option<Self> {
        match meta_type {
            "thumbs_up" => Some(Self::ThumbsUp),
            "thumbs_down" => Some(Self::ThumbsDown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Idle,
    Running {
        run_id: String,
    },
    Completed,
    Error(String),
}

/// Aggregate conversation model. Only the reducer produces new values of it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    pub thread_id: Option<String>,
    /// Most recent run seen, active or not.
    pub run_id: Option<String>,
    pub parent_run_id: Option<String>,
    pub status: RunStatus,
    pub messages: Vec<Message>,
    pub activities: Vec<Activity>,
    pub state: Value,
    pub pending_tool_calls: BTreeMap<String, PendingToolCall>,
    /// Finished tool calls keyed by the parent id they are waiting for.
    pub pending_children: BTreeMap<String, Vec<ToolCall>>,
    pub current_message: Option<Arc<StreamingMessage>>,
    pub current_step: Option<String>,
    pub feedback: BTreeMap<String, Feedback>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            thread_id: None,
            run_id: None,
            parent_run_id: None,
            status: RunStatus::Idle,
            messages: Vec::new(),
            activities: Vec::new(),
            state: Value::Object(Default::default()),
            pending_tool_calls: BTreeMap::new(),
            pending_children: BTreeMap::new(),
            current_message: None,
            current_step: None,
            feedback: BTreeMap::new(),
        }
    }
}

impl ConversationState {
    pub fn is_running(&self) -> bool {
        matches!(self.status, RunStatus::Running { .. })
    }

    pub fn active_run_id(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Running { run_id } => Some(run_id),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    pub fn message_index(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|message| message.id == id)
    }

    /// Committed tool call by id, searching every message.
    pub fn tool_call(&self, id: &str) -> Option<&ToolCall> {
        self.messages
            .iter()
            .find_map(|message| message.tool_call(id))
    }
}
