//! Parent/child resolution for tool calls.
//!
//! Relationships are plain ids: a finished call names its parent through
//! `parent_tool_use_id`, and calls that finish before their parent wait in
//! `pending_children` keyed by that parent id until it is committed.

use agui_events::Role;
use tracing::debug;

use crate::model::{ConversationState, Message, PendingToolCall, ToolCall, ToolCallStatus};

/// Effective parent for a starting tool call.
///
/// Order: the explicit parent, then `parent_message_id` when it names a pending tool
/// call, then `parent_message_id` when it names a committed tool call.
pub fn resolve_parent(
    state: &ConversationState,
    explicit_parent: Option<&str>,
    parent_message_id: Option<&str>,
) -> Option<String> {
    if let Some(parent) = explicit_parent.filter(|id| !id.is_empty()) {
        return Some(parent.to_owned());
    }
    let candidate = parent_message_id.filter(|id| !id.is_empty())?;
    if state.pending_tool_calls.contains_key(candidate) || state.tool_call(candidate).is_some() {
        return Some(candidate.to_owned());
    }
    None
}

/// True when a call with this id is already on a message or buffered as a child.
pub fn is_committed(state: &ConversationState, tool_call_id: &str) -> bool {
    state.tool_call(tool_call_id).is_some() || is_buffered(state, tool_call_id)
}

fn is_buffered(state: &ConversationState, tool_call_id: &str) -> bool {
    state
        .pending_children
        .values()
        .flatten()
        .any(|call| call.id == tool_call_id)
}

/// Commits a finished tool call into the message tree.
///
/// Re-committing an id that is already present is a no-op.
pub fn commit_tool_call(state: &mut ConversationState, pending: PendingToolCall) {
    if is_committed(state, &pending.id) {
        debug!(tool_call_id = %pending.id, "duplicate tool call end dropped");
        return;
    }

    let mut call = ToolCall::new(pending.id, pending.name);
    call.arguments = pending.arguments;
    call.parent_tool_use_id = pending.parent_tool_use_id;
    call.set_status(ToolCallStatus::Completed);

    if let Some(parent_id) = call.parent_tool_use_id.clone() {
        if state.pending_tool_calls.contains_key(&parent_id) || is_buffered(state, &parent_id) {
            state
                .pending_children
                .entry(parent_id)
                .or_default()
                .push(call);
            return;
        }

        if let Some(index) = state
            .messages
            .iter()
            .position(|message| message.tool_call(&parent_id).is_some())
        {
            attach(state, index, call);
            return;
        }
    }

    let owner = pending
        .parent_message_id
        .as_deref()
        .and_then(|id| {
            state
                .messages
                .iter()
                .position(|message| message.id == id && message.role == Role::Assistant)
        })
        .or_else(|| {
            state
                .messages
                .iter()
                .rposition(|message| message.role == Role::Assistant)
        });

    match owner {
        Some(index) => attach(state, index, call),
        None => {
            let mut message = Message::new(call.id.clone(), Role::Tool, String::new());
            message.tool_call_id = Some(call.id.clone());
            message.name = Some(call.name.clone());
            state.messages.push(message);
            let index = state.messages.len() - 1;
            attach(state, index, call);
        }
    }
}

/// Appends `call` to the message at `index` together with every descendant that was
/// buffered waiting for it.
fn attach(state: &mut ConversationState, index: usize, call: ToolCall) {
    let mut queue = vec![call];
    while let Some(call) = queue.pop() {
        let children = state.pending_children.remove(&call.id).unwrap_or_default();
        let message = &mut state.messages[index];
        if message.tool_call(&call.id).is_none() {
            message.tool_calls.push(call);
        }
        queue.extend(children.into_iter().rev());
    }
}

/// Attaches a tool result, searching committed messages first and buffered children
/// second. Returns false when the id is unknown.
pub fn attach_result(
    state: &mut ConversationState,
    tool_call_id: &str,
    content: &str,
    is_error: bool,
) -> bool {
    let mut found = false;
    for message in &mut state.messages {
        if let Some(call) = message.tool_call_mut(tool_call_id) {
            call.complete(content, is_error);
            found = true;
            if message.role == Role::Tool && message.content.is_empty() {
                message.content = content.to_owned();
            }
            break;
        }
    }
    if found {
        return true;
    }

    if let Some(call) = state
        .pending_children
        .values_mut()
        .flatten()
        .find(|call| call.id == tool_call_id)
    {
        call.complete(content, is_error);
        return true;
    }
    false
}
