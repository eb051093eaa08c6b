use agui_events::{AgUiEvent, SseStreamParser};

#[test]
fn sse_framing_parses_sequential_frames() {
    let payload = concat!(
        "data: {\"type\":\"TEXT_MESSAGE_START\",\"messageId\":\"m1\"}\n\n",
        "data: {\"type\":\"TEXT_MESSAGE_CONTENT\",\"messageId\":\"m1\",\"delta\":\"hel\"}\n\n",
        "data: {\"type\":\"TEXT_MESSAGE_END\",\"messageId\":\"m1\"}\n\n"
    );

    let events = SseStreamParser::parse_frames(payload);
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], AgUiEvent::TextMessageStart { .. }));
    assert!(matches!(events[1], AgUiEvent::TextMessageContent { .. }));
    assert!(matches!(events[2], AgUiEvent::TextMessageEnd { .. }));
}

#[test]
fn sse_parser_skips_malformed_and_continues() {
    let mut parser = SseStreamParser::default();
    let events = parser.feed(
        concat!(
            "data: {broken-json\n\n",
            "data: {\"delta\":\"no type\"}\n\n",
            "data: {\"type\":\"CUSTOM\",\"name\":\"x\",\"value\":1}\n\n",
            "data: {\"type\":\"TOOL_CALL_END\",\"toolCallId\":\"t1\"}\n\n"
        )
        .as_bytes(),
    );

    assert_eq!(parser.skipped(), 2);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], AgUiEvent::Unknown { ref event_type, .. } if event_type == "CUSTOM"));
    assert_eq!(events[1], AgUiEvent::tool_end("t1"));
}

#[test]
fn sse_parser_handles_split_frames_incrementally() {
    let mut parser = SseStreamParser::default();
    assert!(parser
        .feed(b"data: {\"type\":\"TOOL_CALL_ARGS\",\"toolCallId\":\"t1\",\"delta\":\"ab\"")
        .is_empty());
    assert!(!parser.is_empty_buffer());

    let events = parser.feed(b"}\n\n");
    assert_eq!(events, vec![AgUiEvent::tool_args("t1", "ab")]);
    assert!(parser.is_empty_buffer());
}

#[test]
fn sse_parser_joins_multi_line_data() {
    let payload = "data: {\"type\":\"TOOL_CALL_END\",\ndata: \"toolCallId\":\"t9\"}\n\n";
    let events = SseStreamParser::parse_frames(payload);
    assert_eq!(events, vec![AgUiEvent::tool_end("t9")]);
}
