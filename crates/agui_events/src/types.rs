use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Message role as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Assistant,
    Tool,
    Activity,
    Developer,
    System,
    Reasoning,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Activity => "activity",
            Self::Developer => "developer",
            Self::System => "system",
            Self::Reasoning => "reasoning",
        }
    }
}

/// Message entry inside a `MESSAGES_SNAPSHOT` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub id: String,
    pub role: Role,
    #[serde(default, deserialize_with = "stringish")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "nullable_vec")]
    pub tool_calls: Vec<WireToolCall>,
}

/// OpenAI-style tool call entry nested in an assistant [`WireMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub function: WireFunction,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_stringish"
    )]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    #[serde(default)]
    pub name: String,
    /// Accumulated argument text; object-shaped arguments are re-encoded as JSON.
    #[serde(default, deserialize_with = "stringish")]
    pub arguments: String,
}

/// Timeline item rendered independently of chat messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type", default)]
    pub activity_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

/// One entry of an `ACTIVITY_DELTA` patch list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ActivityPatch {
    Add {
        activity: Activity,
    },
    Update {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Value>,
    },
    Remove {
        id: String,
    },
}

/// Flattens loosely typed wire text (string, null, content parts, JSON values) into a string.
pub fn text_from_value(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text,
        Value::Array(parts) if parts.iter().all(|part| part.get("text").is_some()) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        other => other.to_string(),
    }
}

fn stringish<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(text_from_value).unwrap_or_default())
}

fn optional_stringish<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(value) => Some(text_from_value(value)),
    })
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wire_message_accepts_object_arguments_and_null_content() {
        let message: WireMessage = serde_json::from_value(json!({
            "id": "m1",
            "role": "assistant",
            "content": null,
            "toolCalls": [{
                "id": "t1",
                "type": "function",
                "function": {"name": "search", "arguments": {"q": "x"}}
            }]
        }))
        .expect("wire message should decode");

        assert_eq!(message.content, "");
        assert_eq!(message.tool_calls[0].function.arguments, r#"{"q":"x"}"#);
        assert_eq!(message.tool_calls[0].kind.as_deref(), Some("function"));
    }

    #[test]
    fn content_parts_are_joined() {
        let message: WireMessage = serde_json::from_value(json!({
            "id": "u1",
            "role": "user",
            "content": [{"type": "text", "text": "hel"}, {"type": "text", "text": "lo"}]
        }))
        .expect("wire message should decode");

        assert_eq!(message.content, "hello");
    }

    #[test]
    fn activity_patch_ops_decode_by_op_tag() {
        let patches: Vec<ActivityPatch> = serde_json::from_value(json!([
            {"op": "add", "activity": {"id": "a1", "type": "clone", "status": "running"}},
            {"op": "update", "id": "a1", "progress": 0.5},
            {"op": "remove", "id": "a1"}
        ]))
        .expect("patches should decode");

        assert!(matches!(&patches[0], ActivityPatch::Add { activity } if activity.activity_type == "clone"));
        assert!(matches!(&patches[1], ActivityPatch::Update { progress: Some(p), .. } if *p == 0.5));
        assert!(matches!(&patches[2], ActivityPatch::Remove { id } if id == "a1"));
    }
}
