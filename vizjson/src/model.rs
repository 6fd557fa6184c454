//! The visualization domain model, as supplied (fully loaded) by the
//! application layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::DateTime;

/// Who can see a visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    Private,
    /// Public to anyone holding the link.
    Link,
    /// Shared within an organization.
    Org,
}

impl Default for Privacy {
    fn default() -> Self {
        Self::Public
    }
}

/// Privacy of a table that a data layer reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TablePrivacy {
    Public,
    Private,
    Link,
}

impl Default for TablePrivacy {
    fn default() -> Self {
        Self::Public
    }
}

/// A reference to the user table backing a data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTable {
    pub name: String,
    #[serde(default)]
    pub privacy: TablePrivacy,
}

/// The kinds of layers a map can hold.
///
/// `LayerGroup` and `NamedMap` are internal bookkeeping kinds and are never
/// shown to clients. Kinds we don't recognize are kept as `Other` so that a
/// single odd layer cannot break loading of the whole visualization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LayerKind {
    Tiled,
    Data,
    Torque,
    LayerGroup,
    NamedMap,
    Other(String),
}

impl LayerKind {
    /// The `type` under which layers of this kind are exposed to clients, if
    /// they're exposed at all.
    pub fn client_type(&self) -> Option<&'static str> {
        match self {
            Self::Tiled => Some("tiled"),
            Self::Data => Some("CartoDB"),
            Self::Torque => Some("torque"),
            Self::LayerGroup | Self::NamedMap | Self::Other(_) => None,
        }
    }

    /// Whether layers of this kind render data from a query.
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data | Self::Torque)
    }
}

impl From<String> for LayerKind {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "tiled" => Self::Tiled,
            "carto" | "cartodb" | "data" => Self::Data,
            "torque" => Self::Torque,
            "layergroup" => Self::LayerGroup,
            "namedmap" => Self::NamedMap,
            _ => Self::Other(s),
        }
    }
}

impl From<LayerKind> for String {
    fn from(kind: LayerKind) -> Self {
        match kind {
            LayerKind::Tiled => "tiled".to_string(),
            LayerKind::Data => "carto".to_string(),
            LayerKind::Torque => "torque".to_string(),
            LayerKind::LayerGroup => "layergroup".to_string(),
            LayerKind::NamedMap => "namedmap".to_string(),
            LayerKind::Other(s) => s,
        }
    }
}

fn default_visible() -> bool {
    true
}

/// A single map layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    pub kind: LayerKind,
    #[serde(default)]
    pub order: u32,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Free-form layer options, exactly as stored.
    #[serde(default)]
    pub options: Map<String, JsonValue>,
    #[serde(default)]
    pub infowindow: Option<JsonValue>,
    #[serde(default)]
    pub tooltip: Option<JsonValue>,
    #[serde(default)]
    pub table: Option<UserTable>,
}

impl Layer {
    /// Get a non-empty string option.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options
            .get(key)
            .and_then(JsonValue::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// The analysis node this layer explicitly reads from, if any.
    pub fn source(&self) -> Option<&str> {
        self.option_str("source")
    }

    /// The raw query for this layer: `sql`, falling back to `query`, falling
    /// back to a full scan of the layer's table.
    pub fn query(&self) -> Option<String> {
        self.option_str("sql")
            .or_else(|| self.option_str("query"))
            .map(str::to_string)
            .or_else(|| {
                self.table
                    .as_ref()
                    .map(|t| format!("select * from {}", t.name))
            })
    }

    /// Whether this layer reads from a private table.
    pub fn has_private_table(&self) -> bool {
        self.table
            .as_ref()
            .map(|t| t.privacy == TablePrivacy::Private)
            .unwrap_or(false)
    }
}

/// A single analysis attached to a visualization.
///
/// `params` may reference further analysis nodes (objects carrying their own
/// `type` and `params`), nested to arbitrary depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: Option<Map<String, JsonValue>>,
    #[serde(default)]
    pub options: Option<Map<String, JsonValue>>,
}

/// Map-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapInfo {
    #[serde(default = "MapInfo::default_provider")]
    pub provider: String,
    /// `[[south, west], [north, east]]`
    #[serde(default)]
    pub bounds: Option<[[f64; 2]; 2]>,
    /// `[lat, lon]`
    #[serde(default)]
    pub center: Option<[f64; 2]>,
    #[serde(default = "MapInfo::default_zoom")]
    pub zoom: u8,
    #[serde(default)]
    pub scrollwheel: bool,
}

impl MapInfo {
    fn default_provider() -> String {
        "leaflet".to_string()
    }

    fn default_zoom() -> u8 {
        3
    }
}

impl Default for MapInfo {
    fn default() -> Self {
        Self {
            provider: Self::default_provider(),
            bounds: None,
            center: None,
            zoom: Self::default_zoom(),
            scrollwheel: false,
        }
    }
}

/// A fully loaded visualization: a map, its layers and its analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub privacy: Privacy,
    #[serde(default)]
    pub map: MapInfo,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub analyses: Vec<Analysis>,
    pub updated_at: DateTime,
}

impl Visualization {
    /// Whether this visualization can only be served through a named map,
    /// i.e. whether its data must not be queried directly by clients.
    pub fn needs_named_map(&self) -> bool {
        matches!(self.privacy, Privacy::Private | Privacy::Org)
            || self.layers.iter().any(Layer::has_private_table)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn layer_kinds_from_strings() {
        assert_eq!(LayerKind::from("CartoDB".to_string()), LayerKind::Data);
        assert_eq!(LayerKind::from("carto".to_string()), LayerKind::Data);
        assert_eq!(LayerKind::from("namedmap".to_string()), LayerKind::NamedMap);
        assert_eq!(
            LayerKind::from("wms".to_string()),
            LayerKind::Other("wms".to_string())
        );
        assert_eq!(LayerKind::LayerGroup.client_type(), None);
        assert_eq!(LayerKind::Data.client_type(), Some("CartoDB"));
    }

    #[test]
    fn query_resolution() {
        let mut layer: Layer = serde_json::from_value(json!({
            "id": "l1",
            "kind": "carto",
            "options": { "query": "select * from other" },
            "table": { "name": "wadus" },
        }))
        .unwrap();
        assert_eq!(layer.query().unwrap(), "select * from other");
        layer
            .options
            .insert("sql".to_string(), json!("select 1 from wadus"));
        assert_eq!(layer.query().unwrap(), "select 1 from wadus");
        layer.options.clear();
        assert_eq!(layer.query().unwrap(), "select * from wadus");
        layer.options.insert("source".to_string(), json!("  "));
        assert_eq!(layer.source(), None);
        assert!(layer.visible);
    }

    #[test]
    fn named_map_requirement() {
        let mut viz: Visualization = serde_json::from_value(json!({
            "id": "viz",
            "updated_at": "2016-07-01T12:54:00Z",
            "layers": [
                { "id": "l1", "kind": "carto", "table": { "name": "wadus", "privacy": "public" } },
            ],
        }))
        .unwrap();
        assert!(!viz.needs_named_map());
        viz.layers[0].table.as_mut().unwrap().privacy = TablePrivacy::Private;
        assert!(viz.needs_named_map());
        viz.layers[0].table = None;
        viz.privacy = Privacy::Org;
        assert!(viz.needs_named_map());
        viz.privacy = Privacy::Link;
        assert!(!viz.needs_named_map());
    }
}
