//! The conversation state machine.
//!
//! [`reduce`] is a pure transition: it never mutates its input and returns the next
//! state. Unknown events and resolution misses leave the state unchanged.

use std::collections::BTreeSet;
use std::sync::Arc;

use agui_events::{AgUiEvent, Role, WireMessage};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::hierarchy::{attach_result, commit_tool_call, is_committed, resolve_parent};
use crate::model::{
    ConversationState, Feedback, FeedbackKind, Message, PendingToolCall, RunStatus,
    StreamingMessage,
};
use crate::patch::{apply_activity_delta, apply_state_delta};
use crate::snapshot::merge_snapshot;

/// Input to [`reduce`]: a protocol event or a local run-control transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Event(AgUiEvent),
    /// User message inserted before the start-run command is issued.
    OptimisticUserMessage(Message),
    RunAccepted {
        run_id: String,
        thread_id: Option<String>,
    },
    RunRejected {
        error: String,
    },
    RunInterrupted,
}

impl From<AgUiEvent> for Action {
    fn from(event: AgUiEvent) -> Self {
        Self::Event(event)
    }
}

/// Per-engine context consulted by every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReducerContext {
    hidden_message_ids: BTreeSet<String>,
}

impl ReducerContext {
    pub fn hide(&mut self, message_id: impl Into<String>) {
        self.hidden_message_ids.insert(message_id.into());
    }

    pub fn is_hidden(&self, message_id: &str) -> bool {
        self.hidden_message_ids.contains(message_id)
    }

    pub fn hidden_message_ids(&self) -> &BTreeSet<String> {
        &self.hidden_message_ids
    }
}

pub fn reduce(
    state: &ConversationState,
    action: &Action,
    context: &ReducerContext,
) -> ConversationState {
    let mut next = state.clone();
    match action {
        Action::Event(event) => apply_event(&mut next, event, context),
        Action::OptimisticUserMessage(message) => {
            if !context.is_hidden(&message.id) && next.message_index(&message.id).is_none() {
                next.messages.push(message.clone());
            }
        }
        Action::RunAccepted { run_id, thread_id } => {
            if let Some(thread_id) = thread_id {
                next.thread_id = Some(thread_id.clone());
            }
            // The push channel may already have delivered this run's terminal event.
            let settled = next.run_id.as_deref() == Some(run_id.as_str())
                && matches!(next.status, RunStatus::Completed | RunStatus::Error(_));
            if !settled {
                next.run_id = Some(run_id.clone());
                next.status = RunStatus::Running {
                    run_id: run_id.clone(),
                };
            }
        }
        Action::RunRejected { error } => next.status = RunStatus::Error(error.clone()),
        Action::RunInterrupted => {
            if next.is_running() {
                next.status = RunStatus::Idle;
            }
        }
    }
    next
}

fn apply_event(state: &mut ConversationState, event: &AgUiEvent, context: &ReducerContext) {
    match event {
        AgUiEvent::RunStarted {
            thread_id,
            run_id,
            parent_run_id,
        } => {
            state.thread_id = Some(thread_id.clone());
            state.run_id = Some(run_id.clone());
            state.parent_run_id = parent_run_id.clone();
            state.status = RunStatus::Running {
                run_id: run_id.clone(),
            };
        }
        AgUiEvent::RunFinished { .. } => {
            flush_current_message(state, context);
            state.current_step = None;
            state.status = RunStatus::Completed;
        }
        AgUiEvent::RunError { message, .. } => {
            flush_current_message(state, context);
            state.current_step = None;
            state.status = RunStatus::Error(message.clone());
        }
        AgUiEvent::StepStarted { step_name } => state.current_step = Some(step_name.clone()),
        AgUiEvent::StepFinished { step_name } => {
            if state.current_step.as_deref() == Some(step_name.as_str()) {
                state.current_step = None;
            }
        }

        AgUiEvent::TextMessageStart { message_id, role } => {
            if context.is_hidden(message_id) {
                return;
            }
            if let Some(current) = &state.current_message {
                if &current.id == message_id {
                    return;
                }
                flush_current_message(state, context);
            }
            state.current_message = Some(Arc::new(StreamingMessage {
                id: message_id.clone(),
                role: *role,
                content: String::new(),
            }));
        }
        AgUiEvent::TextMessageContent { message_id, delta } => {
            if context.is_hidden(message_id) {
                return;
            }
            let (role, mut content) = match state.current_message.as_deref() {
                Some(current) if &current.id == message_id => (current.role, current.content.clone()),
                Some(current) => {
                    debug!(%message_id, current = %current.id, "content for inactive message dropped");
                    return;
                }
                None => (Role::Assistant, String::new()),
            };
            content.push_str(delta);
            state.current_message = Some(Arc::new(StreamingMessage {
                id: message_id.clone(),
                role,
                content,
            }));
        }
        AgUiEvent::TextMessageEnd { message_id } => {
            let streaming = state
                .current_message
                .as_ref()
                .is_some_and(|current| &current.id == message_id);
            if streaming {
                flush_current_message(state, context);
            }
        }

        AgUiEvent::ToolCallStart {
            tool_call_id,
            tool_call_name,
            parent_message_id,
            parent_tool_use_id,
        } => {
            if state.pending_tool_calls.contains_key(tool_call_id)
                || is_committed(state, tool_call_id)
            {
                debug!(%tool_call_id, "duplicate tool call start ignored");
                return;
            }
            let parent = resolve_parent(
                state,
                parent_tool_use_id.as_deref(),
                parent_message_id.as_deref(),
            );
            state.pending_tool_calls.insert(
                tool_call_id.clone(),
                PendingToolCall {
                    id: tool_call_id.clone(),
                    name: tool_call_name.clone(),
                    arguments: String::new(),
                    parent_tool_use_id: parent,
                    parent_message_id: parent_message_id.clone(),
                },
            );
        }
        AgUiEvent::ToolCallArgs {
            tool_call_id,
            delta,
        } => match state.pending_tool_calls.get_mut(tool_call_id) {
            Some(pending) => pending.arguments.push_str(delta),
            None => debug!(%tool_call_id, "arguments for unknown tool call dropped"),
        },
        AgUiEvent::ToolCallEnd { tool_call_id } => {
            let pending = state.pending_tool_calls.remove(tool_call_id);
            if is_committed(state, tool_call_id) {
                debug!(%tool_call_id, "duplicate tool call end dropped");
                return;
            }
            let pending = pending.unwrap_or_else(|| PendingToolCall {
                id: tool_call_id.clone(),
                name: "unknown_tool".to_owned(),
                arguments: String::new(),
                parent_tool_use_id: None,
                parent_message_id: None,
            });
            commit_tool_call(state, pending);
        }
        AgUiEvent::ToolCallResult {
            tool_call_id,
            content,
            is_error,
            ..
        } => {
            if !attach_result(state, tool_call_id, content, *is_error) {
                debug!(%tool_call_id, "result for unknown tool call dropped");
            }
        }

        AgUiEvent::StateSnapshot { snapshot } => state.state = snapshot.clone(),
        AgUiEvent::StateDelta { delta } => state.state = apply_state_delta(&state.state, delta),
        AgUiEvent::MessagesSnapshot { messages } => merge_snapshot(state, messages, context),
        AgUiEvent::ActivitySnapshot { activities } => state.activities = activities.clone(),
        AgUiEvent::ActivityDelta { delta } => apply_activity_delta(&mut state.activities, delta),

        AgUiEvent::Raw { event, .. } => {
            if let Some(message) = raw_message(event) {
                if !context.is_hidden(&message.id) && state.message_index(&message.id).is_none() {
                    state.messages.push(message);
                }
            }
        }
        AgUiEvent::Meta {
            meta_type, payload, ..
        } => {
            let Some(kind) = FeedbackKind::from_meta_type(meta_type) else {
                debug!(%meta_type, "meta event ignored");
                return;
            };
            let Some(message_id) = payload.get("messageId").and_then(Value::as_str) else {
                debug!(%meta_type, "feedback without message id ignored");
                return;
            };
            let comment = payload
                .get("comment")
                .and_then(Value::as_str)
                .filter(|comment| !comment.trim().is_empty())
                .map(str::to_owned);
            state
                .feedback
                .insert(message_id.to_owned(), Feedback { kind, comment });
        }
        AgUiEvent::Unknown { event_type, .. } => {
            debug!(%event_type, "unhandled event type ignored");
        }
    }
}

/// Commits the in-flight message, updating a snapshot copy in place when one exists.
fn flush_current_message(state: &mut ConversationState, context: &ReducerContext) {
    let Some(current) = state.current_message.take() else {
        return;
    };
    if context.is_hidden(&current.id) {
        return;
    }
    match state.messages.iter_mut().find(|message| message.id == current.id) {
        Some(existing) => existing.content = current.content.clone(),
        None => state.messages.push(Message::new(
            current.id.clone(),
            current.role,
            current.content.clone(),
        )),
    }
}

/// Builds a message from a raw payload: thinking blocks, echoed user messages, or a
/// generic `{id, role, content}` message (optionally wrapped in `message`).
fn raw_message(event: &Value) -> Option<Message> {
    let kind = event.get("type").and_then(Value::as_str).unwrap_or_default();
    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| event.get(*key).cloned())
            .map(agui_events::types::text_from_value)
            .unwrap_or_default()
    };
    let id = ["id", "messageId"]
        .iter()
        .find_map(|key| event.get(*key).and_then(Value::as_str))
        .filter(|id| !id.is_empty())
        .map(str::to_owned);

    match kind {
        "thinking_block" => {
            let thinking = text(&["thinking", "content"]);
            let id = id.unwrap_or_else(|| thinking_block_id(&thinking, event.get("timestamp")));
            Some(Message::new(id, Role::Reasoning, thinking))
        }
        "user_message" => Some(Message::user(id?, text(&["content"]))),
        _ => {
            let candidate = event.get("message").unwrap_or(event);
            let message = serde_json::from_value::<WireMessage>(candidate.clone()).ok()?;
            Some(Message::from(message))
        }
    }
}

/// Content-derived id for thinking blocks delivered without one, so redelivery dedupes.
fn thinking_block_id(thinking: &str, timestamp: Option<&Value>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(thinking.as_bytes());
    if let Some(timestamp) = timestamp {
        hasher.update(b"\n");
        hasher.update(timestamp.to_string().as_bytes());
    }
    let digest = hasher.finalize();
    let mut id = String::from("thinking-");
    for byte in &digest[..8] {
        id.push_str(&format!("{byte:02x}"));
    }
    id
}
