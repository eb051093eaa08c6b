use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use agui_events::{normalize_event, AgUiEvent};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::EventLogError;

/// Conventional file name of a persisted session event log.
pub const EVENT_LOG_FILE_NAME: &str = "agui-events.jsonl";

/// One decoded line of an event log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// 1-based line number; 0 for records that did not come from a file.
    pub line: usize,
    pub value: Value,
}

/// A line that was dropped while reading the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line: usize,
    pub reason: String,
}

/// Ordered, replayable sequence of raw event envelopes.
///
/// Malformed lines never abort a read; they are recorded in [`EventLog::skipped`] so
/// callers can surface them without losing the rest of the history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    path: Option<PathBuf>,
    records: Vec<LogRecord>,
    skipped: Vec<SkippedLine>,
}

impl EventLog {
    pub fn open(path: &Path) -> Result<Self, EventLogError> {
        let file = File::open(path)
            .map_err(|source| EventLogError::io("opening event log", path, source))?;
        let reader = BufReader::new(file);
        let mut log = Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        };

        for (line_index, line_result) in reader.lines().enumerate() {
            let line_number = line_index + 1;
            let line =
                line_result.map_err(|source| EventLogError::io_line(path, line_number, source))?;
            log.push_line(line_number, &line);
        }

        debug!(
            path = %path.display(),
            records = log.records.len(),
            skipped = log.skipped.len(),
            "event log loaded"
        );
        Ok(log)
    }

    #[must_use]
    pub fn from_jsonl_str(text: &str) -> Self {
        let mut log = Self::default();
        for (line_index, line) in text.lines().enumerate() {
            log.push_line(line_index + 1, line);
        }
        log
    }

    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            path: None,
            records: values
                .into_iter()
                .map(|value| LogRecord { line: 0, value })
                .collect(),
            skipped: Vec::new(),
        }
    }

    fn push_line(&mut self, line_number: usize, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => self.records.push(LogRecord {
                line: line_number,
                value,
            }),
            Err(error) => {
                warn!(line = line_number, %error, "skipping malformed event log line");
                self.skipped.push(SkippedLine {
                    line: line_number,
                    reason: error.to_string(),
                });
            }
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    #[must_use]
    pub fn skipped(&self) -> &[SkippedLine] {
        &self.skipped
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Narrows every record into a protocol event, dropping the ones that do not decode.
    #[must_use]
    pub fn normalized(&self) -> Vec<AgUiEvent> {
        self.records
            .iter()
            .filter_map(|record| match normalize_event(record.value.clone()) {
                Ok(event) => Some(event),
                Err(error) => {
                    warn!(line = record.line, %error, "skipping malformed event record");
                    None
                }
            })
            .collect()
    }
}
