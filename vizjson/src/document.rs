//! The vizjson document handed to map-rendering clients.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{hash::sha256, Error};

/// A vizjson document: a JSON object with well-known top-level keys
/// (`version`, `layers`, `analyses`, `vector`, `updated_at`, ...).
///
/// Documents coming back from a cache are not validated against any schema,
/// so every accessor is lenient.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Convenience method for constructing a document.
    pub fn with<K, V>(mut self, key: K, value: V) -> Result<Self, Error>
    where
        K: AsRef<str>,
        V: Serialize,
    {
        let _ = self.set(key, value)?;
        Ok(self)
    }

    /// Returns whether or not the document contains a value associated with
    /// the given key.
    pub fn contains_key<K: AsRef<str>>(&self, key: K) -> bool {
        self.0.contains_key(key.as_ref())
    }

    /// Set the value associated with the given key.
    pub fn set<K, V>(&mut self, key: K, value: V) -> Result<Option<Value>, Error>
    where
        K: AsRef<str>,
        V: Serialize,
    {
        let value = serde_json::to_value(value)?;
        Ok(self.0.insert(key.as_ref().to_string(), value))
    }

    /// Get a reference to the value associated with the given key.
    pub fn get<K: AsRef<str>>(&self, key: K) -> Option<&Value> {
        self.0.get(key.as_ref())
    }

    /// A copy of this document without the given keys.
    ///
    /// Handy for comparing documents while ignoring transient fields such as
    /// `updated_at`.
    pub fn without(&self, keys: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| !keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn version(&self) -> Option<&str> {
        self.get("version").and_then(Value::as_str)
    }

    pub fn vector(&self) -> Option<bool> {
        self.get("vector").and_then(Value::as_bool)
    }

    /// The document's layers, or an empty slice if it has none.
    pub fn layers(&self) -> &[Value] {
        self.get("layers")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The `type` of each layer, in order.
    pub fn layer_types(&self) -> Vec<&str> {
        self.layers()
            .iter()
            .filter_map(|l| l.get("type").and_then(Value::as_str))
            .collect()
    }

    /// Overwrite the `vector` flag.
    pub fn set_vector(&mut self, vector: bool) {
        self.0.insert("vector".to_string(), Value::Bool(vector));
    }

    /// Serialize this document to compact JSON. Keys are always sorted, so
    /// equal documents produce identical output.
    pub fn to_json_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Lowercase hexadecimal SHA256 digest of this document's compact JSON
    /// representation. Suitable as an entity tag.
    pub fn digest(&self) -> Result<String, Error> {
        Ok(sha256(self.to_json_string()?))
    }
}

impl From<Map<String, Value>> for Document {
    fn from(m: Map<String, Value>) -> Self {
        Self(m)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.0)
    }
}
