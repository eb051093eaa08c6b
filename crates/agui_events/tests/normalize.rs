use agui_events::{normalize_event, normalize_str, AgUiEvent, MalformedEvent, Role};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn run_lifecycle_events_decode_camel_case_fields() {
    let started = normalize_event(json!({
        "type": "RUN_STARTED",
        "threadId": "thread-1",
        "runId": "run-1",
        "parentRunId": "run-0",
        "timestamp": 1731234567000u64
    }))
    .expect("run started should decode");

    assert_eq!(
        started,
        AgUiEvent::RunStarted {
            thread_id: "thread-1".to_string(),
            run_id: "run-1".to_string(),
            parent_run_id: Some("run-0".to_string()),
        }
    );

    let error = normalize_event(json!({"type": "RUN_ERROR", "message": "boom"}))
        .expect("run error should decode");
    assert!(error.is_terminal());
}

#[test]
fn text_message_start_defaults_role_to_assistant() {
    let event = normalize_event(json!({"type": "TEXT_MESSAGE_START", "messageId": "m1"}))
        .expect("text start should decode");

    assert_eq!(
        event,
        AgUiEvent::TextMessageStart {
            message_id: "m1".to_string(),
            role: Role::Assistant,
        }
    );
}

#[test]
fn tool_call_start_keeps_both_parent_hints() {
    let event = normalize_event(json!({
        "type": "TOOL_CALL_START",
        "toolCallId": "child",
        "toolCallName": "Read",
        "parentMessageId": "msg-1",
        "parentToolUseId": "task-1"
    }))
    .expect("tool start should decode");

    assert_eq!(
        event,
        AgUiEvent::ToolCallStart {
            tool_call_id: "child".to_string(),
            tool_call_name: "Read".to_string(),
            parent_message_id: Some("msg-1".to_string()),
            parent_tool_use_id: Some("task-1".to_string()),
        }
    );
}

#[test]
fn tool_call_result_accepts_structured_content() {
    let event = normalize_event(json!({
        "type": "TOOL_CALL_RESULT",
        "toolCallId": "t1",
        "content": [{"type": "text", "text": "42 files"}],
        "isError": true
    }))
    .expect("tool result should decode");

    assert_eq!(
        event,
        AgUiEvent::ToolCallResult {
            message_id: None,
            tool_call_id: "t1".to_string(),
            content: "42 files".to_string(),
            is_error: true,
        }
    );
}

#[test]
fn messages_snapshot_decodes_nested_tool_calls() {
    let event = normalize_event(json!({
        "type": "MESSAGES_SNAPSHOT",
        "messages": [
            {"id": "u1", "role": "user", "content": "hi"},
            {"id": "a1", "role": "assistant", "content": "", "toolCalls": [
                {"id": "t1", "type": "function", "function": {"name": "search", "arguments": "{}"}}
            ]},
            {"id": "r1", "role": "tool", "content": "done", "toolCallId": "t1"}
        ]
    }))
    .expect("snapshot should decode");

    let AgUiEvent::MessagesSnapshot { messages } = event else {
        panic!("expected messages snapshot");
    };
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].tool_calls[0].function.name, "search");
    assert_eq!(messages[2].tool_call_id.as_deref(), Some("t1"));
}

#[test]
fn raw_and_meta_envelopes_pass_through_opaque() {
    let raw = normalize_event(json!({
        "type": "RAW",
        "event": {"type": "thinking_block", "thinking": "hmm", "traceId": "trace-9"},
        "source": "claude"
    }))
    .expect("raw should decode");
    assert_eq!(raw.trace_id(), Some("trace-9"));

    let meta = normalize_event(json!({
        "type": "META",
        "metaType": "thumbs_up",
        "payload": {"messageId": "a1"},
        "threadId": "thread-1",
        "ts": "2026-01-01T00:00:00Z"
    }))
    .expect("meta should decode");
    assert!(matches!(meta, AgUiEvent::Meta { ref meta_type, .. } if meta_type == "thumbs_up"));
}

#[test]
fn unknown_types_are_forwarded_not_dropped() {
    let payload = json!({"type": "REASONING_START", "messageId": "m1"});
    let event = normalize_event(payload.clone()).expect("unknown type passes through");

    assert_eq!(
        event,
        AgUiEvent::Unknown {
            event_type: "REASONING_START".to_string(),
            payload,
        }
    );
    assert_eq!(event.event_type(), "REASONING_START");
}

#[test]
fn unparsable_text_is_malformed() {
    let error = normalize_str("{broken-json").expect_err("broken json");
    assert!(matches!(error, MalformedEvent::Json(_)));
}

#[test]
fn event_variant_names_stable_on_serialize() {
    let json = serde_json::to_value(AgUiEvent::tool_args("t1", "{\"q\""))
        .expect("serialize tool args");
    assert_eq!(json["type"], "TOOL_CALL_ARGS");
    assert_eq!(json["toolCallId"], "t1");
    assert_eq!(json["delta"], "{\"q\"");
}
