//! Pretty-printed JSON output with an optional metadata envelope.

use serde_json::{json, Map, Value};

/// Render a result as pretty-printed JSON. When `meta` carries entries the
/// payload is wrapped as `{"meta": ..., "data": ...}`; otherwise the data
/// is emitted as-is.
pub fn format_json_output(data: &Value, meta: Option<&Map<String, Value>>) -> String {
    let body = match meta {
        Some(meta) if !meta.is_empty() => json!({ "meta": meta, "data": data }),
        _ => data.clone(),
    };
    serde_json::to_string_pretty(&body).expect("JSON value serializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_output_without_meta() {
        let data = json!({"paperId": "123"});
        let output = format_json_output(&data, None);
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["paperId"], "123");
        assert!(parsed.get("meta").is_none());
    }

    #[test]
    fn meta_wraps_payload() {
        let data = json!({"data": [], "total": 0});
        let mut meta = Map::new();
        meta.insert("query".to_string(), json!("transformers"));
        meta.insert("limit".to_string(), json!(10));

        let output = format_json_output(&data, Some(&meta));
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["meta"]["query"], "transformers");
        assert_eq!(parsed["data"]["total"], 0);
    }

    #[test]
    fn empty_meta_is_not_wrapped() {
        let data = json!([1, 2, 3]);
        let output = format_json_output(&data, Some(&Map::new()));
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert!(parsed.is_array());
    }
}
