//! Property records: the schema-free payload handed to a transport.
//!
//! A record is an ordered JSON object. Layers are combined with
//! [`deep_merge`]: nested objects merge key by key, anything else is replaced
//! by the later layer.

use serde_json::{Map, Value};

use crate::error::{TrackError, TrackResult};

/// Ordered key/value description of one tracked event.
pub type PropertyRecord = Map<String, Value>;

/// Merge `layer` into `target`; keys in `layer` win.
pub fn deep_merge(target: &mut PropertyRecord, layer: &PropertyRecord) {
    for (key, value) in layer {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Fold several layers, least specific first, into a fresh record.
pub fn merge_layers<'a>(layers: impl IntoIterator<Item = &'a PropertyRecord>) -> PropertyRecord {
    let mut merged = PropertyRecord::new();
    for layer in layers {
        deep_merge(&mut merged, layer);
    }
    merged
}

/// Accept a JSON value as a record; only objects qualify.
pub fn record_from_value(value: Value) -> TrackResult<PropertyRecord> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(TrackError::InvalidProperties(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> PropertyRecord {
        record_from_value(value).unwrap()
    }

    #[test]
    fn test_later_layer_wins() {
        let merged = merge_layers([&rec(json!({"a": 1, "b": 1})), &rec(json!({"b": 2}))]);
        assert_eq!(Value::Object(merged), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_nested_objects_merge_keywise() {
        let mut base = rec(json!({"element": {"tagName": "A", "text": "old"}}));
        deep_merge(&mut base, &rec(json!({"element": {"text": "new", "path": "BODY"}})));
        assert_eq!(
            base["element"],
            json!({"tagName": "A", "text": "new", "path": "BODY"})
        );
    }

    #[test]
    fn test_non_object_replaces_object() {
        let mut base = rec(json!({"element": {"tagName": "A"}}));
        deep_merge(&mut base, &rec(json!({"element": "flat"})));
        assert_eq!(base["element"], json!("flat"));
    }

    #[test]
    fn test_merge_preserves_insertion_order() {
        let merged = merge_layers([&rec(json!({"z": 1})), &rec(json!({"a": 2, "m": 3}))]);
        let keys: Vec<_> = merged.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_record_from_value_rejects_non_objects() {
        let err = record_from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, TrackError::InvalidProperties(msg) if msg.contains("an array")));
    }
}
