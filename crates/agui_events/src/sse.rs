use tracing::warn;

use crate::events::AgUiEvent;
use crate::normalize::normalize_str;

/// Incremental parser for Server-Sent Events carrying AG-UI envelopes.
///
/// Bytes are buffered until a blank line closes a frame, so multi-byte characters and
/// JSON split across network chunks are reassembled before decoding.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: Vec<u8>,
    skipped: usize,
}

impl SseStreamParser {
    /// Feed arbitrary bytes and drain the `data:` payloads of every complete frame.
    pub fn feed_payloads(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend(bytes.iter().copied().filter(|byte| *byte != b'\r'));
        let mut payloads = Vec::new();

        while let Some(split) = find_frame_end(&self.buffer) {
            let frame = String::from_utf8_lossy(&self.buffer[..split]).into_owned();
            self.buffer.drain(0..split + 2);

            if let Some(payload) = extract_data_payload(&frame) {
                payloads.push(payload);
            }
        }

        payloads
    }

    /// Feed arbitrary bytes and drain normalized events. Malformed frames are skipped.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<AgUiEvent> {
        let mut events = Vec::new();
        for payload in self.feed_payloads(bytes) {
            match normalize_str(&payload) {
                Ok(event) => events.push(event),
                Err(error) => {
                    self.skipped += 1;
                    warn!(%error, "skipping malformed event frame");
                }
            }
        }
        events
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<AgUiEvent> {
        let mut parser = Self::default();
        parser.feed(input.as_bytes())
    }

    /// Number of frames dropped because they could not be normalized.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|window| window == b"\n\n")
}

fn extract_data_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}
