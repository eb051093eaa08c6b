//! Reconciles an authoritative transcript snapshot with streamed state.

use std::collections::{BTreeMap, BTreeSet};

use agui_events::{Role, WireMessage};

use crate::model::{
    is_placeholder_arguments, is_placeholder_name, ConversationState, Message, ToolCall,
    ToolCallStatus,
};
use crate::reducer::ReducerContext;

/// Merges snapshot messages into `state.messages`.
///
/// Known messages keep their position and absorb the snapshot's fields; new messages are
/// inserted before the next snapshot message that was already known. Streaming-only tool
/// call details survive, and buffered children are discarded afterwards.
pub fn merge_snapshot(
    state: &mut ConversationState,
    snapshot: &[WireMessage],
    context: &ReducerContext,
) {
    let incoming: Vec<Message> = snapshot
        .iter()
        .filter(|message| !context.is_hidden(&message.id))
        .cloned()
        .map(Message::from)
        .collect();
    let incoming = nest_tool_results(incoming);

    let known: BTreeSet<String> = state
        .messages
        .iter()
        .map(|message| message.id.clone())
        .collect();

    for message in &incoming {
        if let Some(index) = state.message_index(&message.id) {
            merge_message(&mut state.messages[index], message.clone());
        }
    }

    for (position, message) in incoming.iter().enumerate() {
        if state.message_index(&message.id).is_some() {
            continue;
        }
        let anchor = incoming[position + 1..]
            .iter()
            .find(|later| known.contains(&later.id))
            .and_then(|later| state.message_index(&later.id));
        match anchor {
            Some(index) => state.messages.insert(index, message.clone()),
            None => state.messages.push(message.clone()),
        }
    }

    recover_placeholder_names(state);
    drop_redundant_tool_messages(state);
    state.pending_children.clear();
}

/// Folds top-level tool-role messages back into the assistant tool calls they belong to.
///
/// A tool message answering a known call becomes that call's result. A tool message
/// answering an unknown call that sits before some parent's result is a sub-agent child:
/// it is nested on the assistant message that introduced the nearest such parent.
fn nest_tool_results(mut messages: Vec<Message>) -> Vec<Message> {
    let parent_ids: BTreeSet<String> = messages
        .iter()
        .filter(|message| message.role == Role::Assistant)
        .flat_map(|message| message.tool_calls.iter().map(|call| call.id.clone()))
        .collect();

    let result_positions: Vec<(usize, String)> = messages
        .iter()
        .enumerate()
        .filter(|(_, message)| message.role == Role::Tool)
        .filter_map(|(index, message)| {
            let id = message.tool_call_id.as_ref()?;
            parent_ids.contains(id).then(|| (index, id.clone()))
        })
        .collect();

    let mut nested = vec![false; messages.len()];

    for index in 0..messages.len() {
        if messages[index].role != Role::Tool {
            continue;
        }
        let Some(call_id) = messages[index].tool_call_id.clone() else {
            continue;
        };
        if parent_ids.contains(&call_id) {
            continue;
        }
        let Some(parent_id) = result_positions
            .iter()
            .filter(|(position, _)| *position > index)
            .min_by_key(|(position, _)| *position)
            .map(|(_, id)| id.clone())
        else {
            continue;
        };
        let Some(owner) = messages[..index].iter().position(|message| {
            message.role == Role::Assistant && message.tool_call(&parent_id).is_some()
        }) else {
            continue;
        };

        let source = &messages[index];
        let mut child = ToolCall::new(
            call_id,
            source.name.clone().unwrap_or_else(|| "tool".to_owned()),
        );
        child.result = Some(source.content.clone());
        child.status = ToolCallStatus::Completed;
        child.parent_tool_use_id = Some(parent_id);
        if messages[owner].tool_call(&child.id).is_none() {
            messages[owner].tool_calls.push(child);
        }
        nested[index] = true;
    }

    for (position, parent_id) in &result_positions {
        let content = messages[*position].content.clone();
        let call = messages
            .iter_mut()
            .filter(|message| message.role == Role::Assistant)
            .find_map(|message| message.tool_call_mut(parent_id));
        if let Some(call) = call {
            call.result = Some(content);
            if !call.status.is_terminal() {
                call.status = ToolCallStatus::Completed;
            }
            nested[*position] = true;
        }
    }

    messages
        .into_iter()
        .zip(nested)
        .filter_map(|(message, nested)| (!nested).then_some(message))
        .collect()
}

fn merge_message(existing: &mut Message, incoming: Message) {
    let known_calls = std::mem::take(&mut existing.tool_calls);

    existing.role = incoming.role;
    if !incoming.content.is_empty() || existing.content.is_empty() {
        existing.content = incoming.content;
    }
    existing.timestamp = incoming.timestamp.or(existing.timestamp.take());
    existing.name = incoming.name.or(existing.name.take());
    existing.tool_call_id = incoming.tool_call_id.or(existing.tool_call_id.take());
    existing.tool_calls = merge_tool_calls(known_calls, incoming.tool_calls);
}

/// Snapshot order first, then streaming-only calls the snapshot does not mention.
fn merge_tool_calls(known: Vec<ToolCall>, incoming: Vec<ToolCall>) -> Vec<ToolCall> {
    let mut known: Vec<Option<ToolCall>> = known.into_iter().map(Some).collect();
    let mut merged = Vec::with_capacity(known.len().max(incoming.len()));

    for call in incoming {
        let previous = known
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|known| known.id == call.id))
            .and_then(Option::take);
        merged.push(match previous {
            Some(previous) => merge_tool_call(previous, call),
            None => call,
        });
    }
    merged.extend(known.into_iter().flatten());
    merged
}

fn merge_tool_call(known: ToolCall, incoming: ToolCall) -> ToolCall {
    ToolCall {
        name: if is_placeholder_name(&known.name) {
            incoming.name
        } else {
            known.name
        },
        arguments: if is_placeholder_arguments(&known.arguments) {
            incoming.arguments
        } else {
            known.arguments
        },
        result: incoming.result.or(known.result),
        status: known.status.advance(incoming.status),
        parent_tool_use_id: incoming.parent_tool_use_id.or(known.parent_tool_use_id),
        id: incoming.id,
    }
}

fn recover_placeholder_names(state: &mut ConversationState) {
    let mut names: BTreeMap<String, String> = BTreeMap::new();
    for message in state.messages.iter().filter(|m| m.role == Role::Tool) {
        if let Some(name) = message.name.as_ref().filter(|name| !is_placeholder_name(name)) {
            let id = message.tool_call_id.as_ref().unwrap_or(&message.id);
            names.entry(id.clone()).or_insert_with(|| name.clone());
        }
        for call in message.tool_calls.iter().filter(|c| !is_placeholder_name(&c.name)) {
            names
                .entry(call.id.clone())
                .or_insert_with(|| call.name.clone());
        }
    }

    let pending = &state.pending_tool_calls;
    for call in state
        .messages
        .iter_mut()
        .flat_map(|message| message.tool_calls.iter_mut())
        .filter(|call| is_placeholder_name(&call.name))
    {
        let better = names.get(&call.id).cloned().or_else(|| {
            pending
                .get(&call.id)
                .map(|pending| pending.name.clone())
                .filter(|name| !is_placeholder_name(name))
        });
        if let Some(name) = better {
            call.name = name;
        }
    }
}

/// Removes tool-role messages whose call already lives on an assistant message.
/// The message content becomes the call's result when it has none; calls carried
/// only by the removed message move to that assistant message.
fn drop_redundant_tool_messages(state: &mut ConversationState) {
    let owner_of = |messages: &[Message], id: &str| {
        messages
            .iter()
            .position(|message| message.role == Role::Assistant && message.tool_call(id).is_some())
            .map(|owner| (owner, id.to_owned()))
    };

    let mut index = 0;
    while index < state.messages.len() {
        let message = &state.messages[index];
        if !message.is_standalone_tool() {
            index += 1;
            continue;
        }
        let owner = owner_of(&state.messages, &message.id).or_else(|| {
            message
                .tool_call_id
                .as_deref()
                .and_then(|id| owner_of(&state.messages, id))
        });
        let Some((owner, call_id)) = owner else {
            index += 1;
            continue;
        };

        let removed = state.messages.remove(index);
        let owner = if owner > index { owner - 1 } else { owner };
        if !removed.content.is_empty() {
            if let Some(call) = state.messages[owner].tool_call_mut(&call_id) {
                if call.result.is_none() {
                    call.result = Some(removed.content.clone());
                }
                if !call.status.is_terminal() {
                    call.set_status(ToolCallStatus::Completed);
                }
            }
        }
        for call in removed.tool_calls {
            if state.tool_call(&call.id).is_none() {
                state.messages[owner].tool_calls.push(call);
            }
        }
    }
}
