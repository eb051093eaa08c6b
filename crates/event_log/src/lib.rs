//! Readers for persisted AG-UI session event logs.
//!
//! The backend appends every pushed envelope to a JSONL file and serves the same
//! history through its export endpoint. Both decode into an [`EventLog`] that can be
//! folded through the conversation reducer to rebuild a transcript offline.

mod error;
mod export;
mod log;

pub use error::EventLogError;
pub use export::SessionExport;
pub use log::{EventLog, LogRecord, SkippedLine, EVENT_LOG_FILE_NAME};
