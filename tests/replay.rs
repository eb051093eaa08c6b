use std::fs;

use agui_session::{Conversation, RunStatus, ToolCallStatus};
use event_log::{EventLog, SessionExport, EVENT_LOG_FILE_NAME};
use pretty_assertions::assert_eq;

const RECORDED_RUN: &str = r#"{"type":"RUN_STARTED","threadId":"s1","runId":"r1"}
{"type":"TEXT_MESSAGE_START","messageId":"u1","role":"user"}
{"type":"TEXT_MESSAGE_CONTENT","messageId":"u1","delta":"count the files"}
{"type":"TEXT_MESSAGE_END","messageId":"u1"}
{"type":"TEXT_MESSAGE_START","messageId":"a1"}
{"type":"TEXT_MESSAGE_CONTENT","messageId":"a1","delta":"Running ls."}
{"type":"TEXT_MESSAGE_END","messageId":"a1"}
not-json
{"type":"TOOL_CALL_START","toolCallId":"t1","toolCallName":"Bash","parentMessageId":"a1"}
{"type":"TOOL_CALL_ARGS","toolCallId":"t1","delta":"{\"cmd\":\"ls\"}"}
{"type":"TOOL_CALL_END","toolCallId":"t1"}
{"type":"TOOL_CALL_RESULT","toolCallId":"t1","messageId":"r-t1","content":"a\nb"}

{"type":"CUSTOM","name":"progress"}
{"type":"RUN_FINISHED","threadId":"s1","runId":"r1"}
"#;

#[test]
fn jsonl_log_replays_into_a_conversation() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(EVENT_LOG_FILE_NAME);
    fs::write(&path, RECORDED_RUN).expect("write log");

    let log = EventLog::open(&path).expect("log should open");
    assert_eq!(log.skipped().len(), 1);

    let mut conversation = Conversation::new();
    conversation.replay(log.normalized());

    let state = conversation.state();
    assert_eq!(state.status, RunStatus::Completed);
    let ids: Vec<&str> = state.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["u1", "a1"]);
    let call = state.messages[1].tool_call("t1").expect("t1 on a1");
    assert_eq!(call.result.as_deref(), Some("a\nb"));
    assert_eq!(call.status, ToolCallStatus::Completed);
}

#[test]
fn replay_is_deterministic() {
    let log = EventLog::from_jsonl_str(RECORDED_RUN);

    let mut first = Conversation::new();
    first.replay(log.normalized());
    let mut second = Conversation::new();
    second.replay(log.normalized());

    assert_eq!(first.state(), second.state());
}

#[test]
fn export_body_replays_like_the_log() {
    let events: Vec<serde_json::Value> = RECORDED_RUN
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    let body = serde_json::json!({
        "sessionId": "s1",
        "projectName": "demo",
        "exportDate": "2026-03-01T12:00:00Z",
        "aguiEvents": events,
        "hasLegacy": false
    })
    .to_string();

    let export = SessionExport::from_json_str(&body).expect("export should decode");
    let mut from_export = Conversation::new();
    from_export.replay(export.event_log().normalized());
    let mut from_log = Conversation::new();
    from_log.replay(EventLog::from_jsonl_str(RECORDED_RUN).normalized());

    assert_eq!(from_export.state(), from_log.state());
}
