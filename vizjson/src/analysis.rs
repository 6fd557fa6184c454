//! Serialization of analysis trees for clients.
//!
//! `source` nodes may embed the very queries that layer redaction hides, so
//! their `params` never leave the server, at whatever depth they appear.

use serde_json::{Map, Value as JsonValue};

use crate::Analysis;

/// The analysis node type whose parameters are always withheld.
pub const SOURCE_NODE_TYPE: &str = "source";

/// Keys of a redacted node that survive redaction.
const IDENTIFYING_KEYS: &[&str] = &["id", "type"];

/// Serializes the given analyses, in order.
pub fn serialize_analyses(analyses: &[Analysis]) -> Vec<JsonValue> {
    analyses
        .iter()
        .map(|analysis| serialize_analysis(analysis, &is_source_node))
        .collect()
}

/// Serializes a single analysis as `{id, type, params[, options]}`, withholding
/// the params of every node (including the root) for which `redact_params`
/// holds.
pub fn serialize_analysis<F>(analysis: &Analysis, redact_params: &F) -> JsonValue
where
    F: Fn(&Map<String, JsonValue>) -> bool,
{
    let mut node = Map::new();
    node.insert("id".to_string(), JsonValue::String(analysis.id.clone()));
    node.insert("type".to_string(), JsonValue::String(analysis.kind.clone()));
    if let Some(params) = &analysis.params {
        node.insert("params".to_string(), JsonValue::Object(params.clone()));
    }
    if let Some(options) = &analysis.options {
        node.insert("options".to_string(), JsonValue::Object(options.clone()));
    }
    redact_node(&node, redact_params)
}

/// Whether the given node is a `source` node.
pub fn is_source_node(node: &Map<String, JsonValue>) -> bool {
    node.get("type").and_then(JsonValue::as_str) == Some(SOURCE_NODE_TYPE)
}

/// Builds a redacted copy of an arbitrary JSON value, treating every object
/// as a potential analysis node.
fn redact_value<F>(value: &JsonValue, redact_params: &F) -> JsonValue
where
    F: Fn(&Map<String, JsonValue>) -> bool,
{
    match value {
        JsonValue::Object(obj) => redact_node(obj, redact_params),
        JsonValue::Array(arr) => JsonValue::Array(
            arr.iter()
                .map(|v| redact_value(v, redact_params))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn redact_node<F>(node: &Map<String, JsonValue>, redact_params: &F) -> JsonValue
where
    F: Fn(&Map<String, JsonValue>) -> bool,
{
    if redact_params(node) {
        return JsonValue::Object(
            IDENTIFYING_KEYS
                .iter()
                .filter_map(|key| node.get(*key).map(|v| (key.to_string(), v.clone())))
                .collect(),
        );
    }
    JsonValue::Object(
        node.iter()
            .map(|(k, v)| (k.clone(), redact_value(v, redact_params)))
            .collect(),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn analysis(value: JsonValue) -> Analysis {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn nested_source_params_are_withheld() {
        let a = analysis(json!({
            "id": "a1",
            "type": "buffer",
            "params": {
                "radius": 300,
                "source": {
                    "id": "a0",
                    "type": "source",
                    "params": { "query": "select * from secret_table" },
                    "options": { "table_name": "secret_table" },
                },
            },
        }));
        let serialized = serialize_analyses(&[a.clone()]);
        assert_eq!(serialized.len(), 1);
        let source = &serialized[0]["params"]["source"];
        assert_eq!(source["type"], json!("source"));
        assert_eq!(source["id"], json!("a0"));
        assert!(source.get("params").is_none());
        assert!(source.get("options").is_none());
        assert_eq!(serialized[0]["params"]["radius"], json!(300));
        // The domain model is untouched.
        assert!(a.params.unwrap()["source"]["params"].is_object());
    }

    #[test]
    fn redaction_applies_at_any_depth() {
        let a = analysis(json!({
            "id": "a3",
            "type": "intersection",
            "params": {
                "sources": [
                    {
                        "id": "a2",
                        "type": "trade-area",
                        "params": {
                            "source": {
                                "id": "a1",
                                "type": "source",
                                "params": { "query": "select 1" },
                            },
                        },
                    },
                    { "id": "a0", "type": "source", "params": { "query": "select 2" } },
                ],
            },
        }));
        let serialized = serialize_analyses(&[a]);
        let sources = serialized[0]["params"]["sources"].as_array().unwrap();
        assert_eq!(
            sources[0]["params"]["source"],
            json!({ "id": "a1", "type": "source" })
        );
        assert_eq!(sources[1], json!({ "id": "a0", "type": "source" }));
        assert_eq!(sources[0]["type"], json!("trade-area"));
    }

    #[test]
    fn top_level_source_is_redacted() {
        let a = analysis(json!({
            "id": "a0",
            "type": "source",
            "params": { "query": "select * from t" },
        }));
        assert_eq!(
            serialize_analyses(&[a]),
            vec![json!({ "id": "a0", "type": "source" })]
        );
    }

    #[test]
    fn custom_predicate() {
        let a = analysis(json!({
            "id": "a1",
            "type": "buffer",
            "params": { "radius": 5 },
        }));
        let everything = |_: &Map<String, JsonValue>| true;
        assert_eq!(
            serialize_analysis(&a, &everything),
            json!({ "id": "a1", "type": "buffer" })
        );
    }
}
