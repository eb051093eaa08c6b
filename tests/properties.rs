use std::sync::Arc;

use agui_session::{
    reduce, Action, AgUiEvent, ConversationState, Message, ReducerContext, ToolCallStatus,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn step(state: &ConversationState, event: AgUiEvent) -> ConversationState {
    reduce(state, &Action::Event(event), &ReducerContext::default())
}

fn fold(events: &[AgUiEvent]) -> ConversationState {
    events
        .iter()
        .cloned()
        .fold(ConversationState::default(), |state, event| step(&state, event))
}

fn snapshot_event(messages: serde_json::Value) -> AgUiEvent {
    agui_session::normalize_event(json!({"type": "MESSAGES_SNAPSHOT", "messages": messages}))
        .expect("snapshot should normalize")
}

#[test]
fn duplicate_tool_end_is_idempotent() {
    let prefixes: Vec<Vec<AgUiEvent>> = vec![
        vec![
            AgUiEvent::text_start("a1"),
            AgUiEvent::text_end("a1"),
            AgUiEvent::tool_start("t1", "ls", None),
            AgUiEvent::tool_end("t1"),
        ],
        vec![
            AgUiEvent::tool_start("t1", "ls", None),
            AgUiEvent::tool_end("t1"),
        ],
        vec![
            AgUiEvent::tool_start("p", "Task", None),
            AgUiEvent::tool_start("t1", "Read", Some("p".to_owned())),
            AgUiEvent::tool_end("t1"),
        ],
        vec![AgUiEvent::tool_end("t1")],
    ];

    for prefix in prefixes {
        let once = fold(&prefix);
        let twice = step(&once, AgUiEvent::tool_end("t1"));
        assert_eq!(twice, once);
    }
}

#[test]
fn duplicate_text_end_is_idempotent() {
    let once = fold(&[
        AgUiEvent::text_start("m1"),
        AgUiEvent::text_content("m1", "hi"),
        AgUiEvent::text_end("m1"),
    ]);
    let twice = step(&once, AgUiEvent::text_end("m1"));

    assert_eq!(twice, once);
    assert_eq!(twice.messages.len(), 1);
}

#[test]
fn known_messages_keep_their_order_across_snapshots() {
    let base = fold(&[
        AgUiEvent::text_start("a1"),
        AgUiEvent::text_end("a1"),
        AgUiEvent::text_start("a2"),
        AgUiEvent::text_end("a2"),
    ]);
    let snapshots = vec![
        json!([
            {"id": "u1", "role": "user", "content": "q1"},
            {"id": "a1", "role": "assistant", "content": "r1"},
            {"id": "u2", "role": "user", "content": "q2"},
            {"id": "a2", "role": "assistant", "content": "r2"}
        ]),
        json!([
            {"id": "a1", "role": "assistant", "content": "r1"},
            {"id": "u3", "role": "user", "content": "q3"},
            {"id": "u4", "role": "user", "content": "q4"}
        ]),
        json!([
            {"id": "u0", "role": "user", "content": "q0"},
            {"id": "a2", "role": "assistant", "content": "r2"}
        ]),
    ];

    let mut state = base;
    for messages in snapshots {
        let known: Vec<String> = state.messages.iter().map(|m| m.id.clone()).collect();
        let order: Vec<String> = messages
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|m| m["id"].as_str().map(str::to_owned))
            .collect();

        let next = step(&state, snapshot_event(messages));
        let position = |id: &str| next.message_index(id).expect("id present");

        let known_positions: Vec<usize> = known.iter().map(|id| position(id.as_str())).collect();
        assert!(
            known_positions.windows(2).all(|pair| pair[0] < pair[1]),
            "known messages must not reorder"
        );

        for (index, id) in order.iter().enumerate() {
            if known.contains(id) {
                continue;
            }
            for later in order[index + 1..].iter().filter(|later| known.contains(*later)) {
                assert!(
                    position(id.as_str()) < position(later.as_str()),
                    "{id} must land before known {later}"
                );
            }
        }
        state = next;
    }
}

#[test]
fn tool_status_never_regresses() {
    let mut state = fold(&[
        AgUiEvent::text_start("a1"),
        AgUiEvent::text_end("a1"),
        AgUiEvent::tool_start("t1", "ls", None),
        AgUiEvent::tool_end("t1"),
    ]);
    let replays = vec![
        AgUiEvent::tool_start("t1", "ls", None),
        AgUiEvent::tool_args("t1", "{}"),
        AgUiEvent::tool_end("t1"),
        snapshot_event(json!([
            {"id": "a1", "role": "assistant", "content": "", "toolCalls": [
                {"id": "t1", "function": {"name": "ls", "arguments": ""}, "status": "running"}
            ]}
        ])),
        AgUiEvent::tool_result("t1", "ok"),
    ];

    for event in replays {
        state = step(&state, event);
        let status = state.tool_call("t1").map(|c| c.status).expect("t1 present");
        assert!(status.is_terminal(), "status regressed to {status:?}");
    }
    assert_eq!(
        state.tool_call("t1").map(|c| c.status),
        Some(ToolCallStatus::Completed)
    );
}

#[test]
fn every_content_delta_yields_a_new_streaming_object() {
    let mut state = fold(&[AgUiEvent::text_start("m1")]);
    let mut previous = Arc::clone(state.current_message.as_ref().expect("streaming"));

    for delta in ["a", "b", "", "c"] {
        state = step(&state, AgUiEvent::text_content("m1", delta));
        let current = Arc::clone(state.current_message.as_ref().expect("streaming"));
        assert!(!Arc::ptr_eq(&previous, &current));
        previous = current;
    }
    assert_eq!(previous.content, "abc");
}

#[test]
fn buffered_child_is_flushed_exactly_once_under_its_parent() {
    let state = fold(&[
        AgUiEvent::tool_start("P", "Task", None),
        AgUiEvent::ToolCallStart {
            tool_call_id: "C".to_owned(),
            tool_call_name: "Read".to_owned(),
            parent_message_id: None,
            parent_tool_use_id: Some("P".to_owned()),
        },
        AgUiEvent::tool_end("C"),
    ]);
    assert!(state.tool_call("C").is_none());
    assert_eq!(state.pending_children["P"].len(), 1);

    let state = step(&state, AgUiEvent::tool_end("P"));

    let owner = state
        .messages
        .iter()
        .find(|m| m.tool_call("P").is_some())
        .expect("P committed");
    assert_eq!(owner.child_tool_calls("P").count(), 1);
    let occurrences = state
        .messages
        .iter()
        .flat_map(|m| m.tool_calls.iter())
        .filter(|c| c.id == "C")
        .count();
    assert_eq!(occurrences, 1);
    assert!(state.pending_children.is_empty());
}

#[test]
fn optimistic_message_is_not_duplicated_by_snapshot() {
    let context = ReducerContext::default();
    let state = reduce(
        &ConversationState::default(),
        &Action::OptimisticUserMessage(
            Message::user("local-1", "hello").with_timestamp("2026-01-01T00:00:00Z"),
        ),
        &context,
    );
    assert_eq!(state.messages.len(), 1);

    let state = step(
        &state,
        snapshot_event(json!([
            {"id": "local-1", "role": "user", "content": "hello"},
            {"id": "a1", "role": "assistant", "content": "hi!"}
        ])),
    );

    let matching: Vec<&Message> = state.messages.iter().filter(|m| m.id == "local-1").collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].content, "hello");
    assert_eq!(state.messages[0].id, "local-1");
}

#[test]
fn tool_call_scenario_accumulates_arguments() {
    let state = fold(&[
        AgUiEvent::tool_start("t1", "search", None),
        AgUiEvent::tool_args("t1", "{\"q\":\"x\""),
        AgUiEvent::tool_args("t1", "}"),
        AgUiEvent::tool_end("t1"),
    ]);

    let call = state.tool_call("t1").expect("t1 committed");
    assert_eq!(call.arguments, "{\"q\":\"x\"}");
    assert_eq!(call.status, ToolCallStatus::Completed);
}
