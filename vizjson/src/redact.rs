//! Layer redaction: deciding which layer options a client gets to see.
//!
//! Which of the sensitive fields (`sql`, `cartocss`, `source`) a data layer
//! exposes is a pure function of the variant being rendered and of whether
//! the layer has an explicit `source`. Those combinations are enumerated in a
//! [`RedactionTable`] per document schema.

use log::trace;
use serde_json::{json, Map, Value as JsonValue};

use crate::{
    context::Variant, named_map::NamedMapSources, Layer, LayerKind, Viewer, Visualization,
};

/// Query-sandboxing wrapper template handed to clients alongside data layers.
pub const SQL_WRAP: &str = "select * from (<%= sql %>) __wrap";

/// Options that only make sense server-side and are never exposed.
pub const INTERNAL_OPTIONS: &[&str] = &[
    "stat_tag",
    "maps_api_template",
    "sql_api_template",
    "named_map",
];

/// Options of tiled (base map) layers that are passed through when present.
pub const TILED_OPTIONS: &[&str] = &[
    "name",
    "urlTemplate",
    "attribution",
    "minZoom",
    "maxZoom",
    "subdomains",
    "tms",
];

/// Options of data and torque layers that are passed through when present,
/// independently of redaction.
pub const DATA_OPTIONS: &[&str] = &["layer_name", "attribution", "interactivity"];

/// Whether and how a data layer's `source` is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePolicy {
    Omit,
    /// The layer's own `source` option.
    Explicit,
    /// The layer's own `source` option, or else whatever the named-map backend
    /// resolves for the layer.
    ExplicitOrResolved,
}

/// How an exposed `source` is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStyle {
    /// `"source": "a1"`
    Id,
    /// `"source": { "id": "a1" }`
    Object,
}

/// The redaction-controlled fields a data layer exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPolicy {
    pub sql: bool,
    pub cartocss: bool,
    pub source: SourcePolicy,
    pub sql_wrap: bool,
}

/// Field policies for data layers, keyed by (variant, has explicit source).
#[derive(Debug, Clone, Copy)]
pub struct RedactionTable {
    pub rules: [(Variant, bool, FieldPolicy); 4],
    pub source_style: SourceStyle,
}

impl RedactionTable {
    /// Look up the policy for the given combination.
    pub fn policy(&self, variant: Variant, has_source: bool) -> FieldPolicy {
        self.rules
            .iter()
            .find(|(v, s, _)| *v == variant && *s == has_source)
            .map(|(_, _, policy)| *policy)
            // The table is exhaustive; fall back to exposing nothing.
            .unwrap_or(FieldPolicy {
                sql: false,
                cartocss: false,
                source: SourcePolicy::Omit,
                sql_wrap: false,
            })
    }
}

/// Redaction rules of the "3.0.0" document schema.
pub const VIZJSON3_RULES: RedactionTable = RedactionTable {
    rules: [
        (
            Variant::Direct,
            false,
            FieldPolicy {
                sql: true,
                cartocss: true,
                source: SourcePolicy::Omit,
                sql_wrap: true,
            },
        ),
        (
            Variant::Direct,
            true,
            FieldPolicy {
                sql: false,
                cartocss: true,
                source: SourcePolicy::Explicit,
                sql_wrap: true,
            },
        ),
        (
            Variant::NamedMap,
            false,
            FieldPolicy {
                sql: false,
                cartocss: false,
                source: SourcePolicy::ExplicitOrResolved,
                sql_wrap: true,
            },
        ),
        (
            Variant::NamedMap,
            true,
            FieldPolicy {
                sql: false,
                cartocss: false,
                source: SourcePolicy::Explicit,
                sql_wrap: true,
            },
        ),
    ],
    source_style: SourceStyle::Id,
};

/// Produces the client-visible options of layers within one visualization.
pub struct LayerRedactor<'a> {
    visualization: &'a Visualization,
    table: &'a RedactionTable,
    sources: &'a dyn NamedMapSources,
    viewer: Option<&'a Viewer>,
}

impl<'a> LayerRedactor<'a> {
    /// Constructor.
    pub fn new(
        visualization: &'a Visualization,
        table: &'a RedactionTable,
        sources: &'a dyn NamedMapSources,
        viewer: Option<&'a Viewer>,
    ) -> Self {
        Self {
            visualization,
            table,
            sources,
            viewer,
        }
    }

    /// Returns the options of the given layer that are visible when rendering
    /// the given variant, or `None` if the layer is never shown to clients.
    pub fn redact(&self, layer: &Layer, variant: Variant) -> Option<Map<String, JsonValue>> {
        match layer.kind {
            LayerKind::Tiled => Some(pick(&layer.options, TILED_OPTIONS)),
            LayerKind::Data | LayerKind::Torque => Some(self.redact_data(layer, variant)),
            LayerKind::LayerGroup | LayerKind::NamedMap | LayerKind::Other(_) => None,
        }
    }

    fn redact_data(&self, layer: &Layer, variant: Variant) -> Map<String, JsonValue> {
        let explicit_source = layer.source();
        let policy = self.table.policy(variant, explicit_source.is_some());
        trace!(
            "Layer {} ({:?}) rendered with policy {:?}",
            layer.id,
            variant,
            policy
        );
        let mut options = pick(&layer.options, DATA_OPTIONS);
        if policy.sql {
            if let Some(sql) = layer.query() {
                options.insert("sql".to_string(), JsonValue::String(sql));
            }
        }
        if policy.cartocss {
            for key in ["cartocss", "cartocss_version"] {
                if let Some(v) = layer.options.get(key) {
                    options.insert(key.to_string(), v.clone());
                }
            }
        }
        let source = match policy.source {
            SourcePolicy::Omit => None,
            SourcePolicy::Explicit => explicit_source.map(str::to_string),
            SourcePolicy::ExplicitOrResolved => explicit_source.map(str::to_string).or_else(|| {
                self.sources
                    .source_for(self.visualization, layer, self.viewer)
            }),
        };
        if let Some(source) = source {
            let source = match self.table.source_style {
                SourceStyle::Id => JsonValue::String(source),
                SourceStyle::Object => json!({ "id": source }),
            };
            options.insert("source".to_string(), source);
        }
        if policy.sql_wrap {
            options.insert("sql_wrap".to_string(), JsonValue::String(SQL_WRAP.to_string()));
        }
        options
    }
}

/// Copies the allowed keys that are present in `options`.
fn pick(options: &Map<String, JsonValue>, allowed: &[&str]) -> Map<String, JsonValue> {
    allowed
        .iter()
        .filter_map(|key| options.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect()
}
