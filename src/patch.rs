use agui_events::{Activity, ActivityPatch};
use json_patch::PatchOperation;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Applies `add` / `replace` / `remove` operations to the free-form state, one at a time.
///
/// `replace` of a missing path falls back to `add`, `remove` of a missing path is a
/// no-op, and other operation kinds are ignored.
pub fn apply_state_delta(state: &Value, operations: &[Value]) -> Value {
    let mut document = if state.is_null() {
        Value::Object(Map::new())
    } else {
        state.clone()
    };

    for operation in operations {
        let op = operation.get("op").and_then(Value::as_str).unwrap_or_default();
        match op {
            "add" => {
                if let Err(error) = apply_one(&mut document, operation) {
                    warn!(%error, "state delta add failed");
                }
            }
            "replace" => {
                if apply_one(&mut document, operation).is_err() {
                    let mut as_add = operation.clone();
                    as_add["op"] = Value::from("add");
                    if let Err(error) = apply_one(&mut document, &as_add) {
                        warn!(%error, "state delta replace failed");
                    }
                }
            }
            "remove" => {
                if let Err(error) = apply_one(&mut document, operation) {
                    debug!(%error, "state delta remove of missing path ignored");
                }
            }
            other => debug!(op = other, "unsupported state delta operation ignored"),
        }
    }

    document
}

fn apply_one(document: &mut Value, operation: &Value) -> Result<(), String> {
    let operation: PatchOperation =
        serde_json::from_value(operation.clone()).map_err(|error| error.to_string())?;
    json_patch::patch(document, &[operation]).map_err(|error| error.to_string())
}

/// Applies activity patches by id. `add` upserts, `update` merges the given fields.
pub fn apply_activity_delta(activities: &mut Vec<Activity>, patches: &[ActivityPatch]) {
    for patch in patches {
        match patch {
            ActivityPatch::Add { activity } => {
                match activities.iter_mut().find(|existing| existing.id == activity.id) {
                    Some(existing) => *existing = activity.clone(),
                    None => activities.push(activity.clone()),
                }
            }
            ActivityPatch::Update {
                id,
                status,
                progress,
                content,
            } => {
                let Some(existing) = activities.iter_mut().find(|existing| &existing.id == id)
                else {
                    debug!(activity_id = %id, "update for unknown activity dropped");
                    continue;
                };
                if let Some(status) = status {
                    existing.status = status.clone();
                }
                if progress.is_some() {
                    existing.progress = *progress;
                }
                if content.is_some() {
                    existing.content = content.clone();
                }
            }
            ActivityPatch::Remove { id } => activities.retain(|existing| &existing.id != id),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn replace_of_missing_key_adds_it() {
        let next = apply_state_delta(
            &json!({"a": 1}),
            &[json!({"op": "replace", "path": "/b", "value": 2})],
        );
        assert_eq!(next, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn remove_of_missing_key_is_a_no_op() {
        let state = json!({"a": 1});
        let next = apply_state_delta(
            &state,
            &[
                json!({"op": "remove", "path": "/missing"}),
                json!({"op": "remove", "path": "/a"}),
            ],
        );
        assert_eq!(next, json!({}));
    }

    #[test]
    fn unsupported_ops_leave_state_untouched() {
        let state = json!({"a": 1});
        let next = apply_state_delta(
            &state,
            &[
                json!({"op": "test", "path": "/a", "value": 1}),
                json!({"op": "move", "from": "/a", "path": "/b"}),
            ],
        );
        assert_eq!(next, state);
    }

    #[test]
    fn null_state_starts_as_object() {
        let next = apply_state_delta(
            &Value::Null,
            &[json!({"op": "add", "path": "/phase", "value": "clone"})],
        );
        assert_eq!(next, json!({"phase": "clone"}));
    }

    #[test]
    fn activity_update_merges_only_given_fields() {
        let mut activities = vec![Activity {
            id: "a1".to_owned(),
            activity_type: "clone".to_owned(),
            status: "running".to_owned(),
            progress: Some(0.1),
            content: None,
        }];

        apply_activity_delta(
            &mut activities,
            &[ActivityPatch::Update {
                id: "a1".to_owned(),
                status: None,
                progress: Some(0.5),
                content: None,
            }],
        );

        assert_eq!(activities[0].status, "running");
        assert_eq!(activities[0].progress, Some(0.5));
    }
}
