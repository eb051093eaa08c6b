use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::EventLogError;
use crate::log::EventLog;

/// Body of the session export endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    pub session_id: String,
    pub project_name: String,
    pub export_date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub agui_events: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_messages: Option<Vec<Value>>,
    #[serde(default)]
    pub has_legacy: bool,
}

impl SessionExport {
    pub fn from_json_str(text: &str) -> Result<Self, EventLogError> {
        serde_json::from_str(text).map_err(EventLogError::ExportDecode)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, EventLogError> {
        serde_json::from_slice(bytes).map_err(EventLogError::ExportDecode)
    }

    pub fn exported_at(&self) -> Result<OffsetDateTime, EventLogError> {
        OffsetDateTime::parse(&self.export_date, &Rfc3339).map_err(|_| {
            EventLogError::InvalidExportDate {
                value: self.export_date.clone(),
            }
        })
    }

    /// Exported events as a replayable log, in recorded order.
    #[must_use]
    pub fn event_log(&self) -> EventLog {
        EventLog::from_values(self.agui_events.iter().cloned())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}
