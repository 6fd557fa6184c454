//! The legacy ("0.1.0") document schema.
//!
//! Legacy documents group all data layers into a single `layergroup` entry
//! carrying a `layer_definition`. They coexist with "3.0.0" documents for the
//! same visualizations, so they're built by an independent builder with its
//! own redaction rules.

use log::debug;
use serde_json::{json, Map, Value as JsonValue};

use crate::{
    builder::VizJsonBuilder,
    context::{RenderingContext, Variant},
    named_map::NoNamedMapSources,
    redact::{FieldPolicy, LayerRedactor, RedactionTable, SourcePolicy, SourceStyle},
    Document, Error, LayerKind, Visualization,
};

/// Version of the layer definition nested inside the layergroup entry.
pub const LAYER_DEFINITION_VERSION: &str = "1.0.1";

/// Redaction rules of the legacy schema: raw queries are only withheld when a
/// named map reads from an explicit analysis source.
pub const LEGACY_RULES: RedactionTable = RedactionTable {
    rules: [
        (
            Variant::Direct,
            false,
            FieldPolicy {
                sql: true,
                cartocss: true,
                source: SourcePolicy::Omit,
                sql_wrap: false,
            },
        ),
        (
            Variant::Direct,
            true,
            FieldPolicy {
                sql: true,
                cartocss: true,
                source: SourcePolicy::Omit,
                sql_wrap: false,
            },
        ),
        (
            Variant::NamedMap,
            false,
            FieldPolicy {
                sql: true,
                cartocss: true,
                source: SourcePolicy::Omit,
                sql_wrap: false,
            },
        ),
        (
            Variant::NamedMap,
            true,
            FieldPolicy {
                sql: false,
                cartocss: true,
                source: SourcePolicy::Explicit,
                sql_wrap: false,
            },
        ),
    ],
    source_style: SourceStyle::Object,
};

/// Builder for the legacy ("0.1.0") document schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyBuilder;

impl LegacyBuilder {
    pub const VERSION: &'static str = "0.1.0";
}

impl VizJsonBuilder for LegacyBuilder {
    fn version(&self) -> &'static str {
        Self::VERSION
    }

    fn build(
        &self,
        visualization: &Visualization,
        ctx: &RenderingContext,
    ) -> Result<Document, Error> {
        let variant = ctx.effective_variant(visualization);
        let redactor = LayerRedactor::new(
            visualization,
            &LEGACY_RULES,
            &NoNamedMapSources,
            ctx.viewer.as_ref(),
        );

        let mut base_layers = Vec::new();
        let mut sublayers = Vec::new();
        let mut torque_layers = Vec::new();
        for layer in &visualization.layers {
            let options = match redactor.redact(layer, variant) {
                Some(options) => options,
                None => continue,
            };
            match layer.kind {
                LayerKind::Tiled => base_layers.push(json!({
                    "id": layer.id,
                    "type": "tiled",
                    "order": layer.order,
                    "options": options,
                })),
                LayerKind::Data => sublayers.push(json!({
                    "id": layer.id,
                    "type": "cartodb",
                    "visible": layer.visible,
                    "options": options,
                })),
                LayerKind::Torque => torque_layers.push(json!({
                    "id": layer.id,
                    "type": "torque",
                    "order": layer.order,
                    "options": options,
                })),
                _ => (),
            }
        }

        let mut layers = base_layers;
        if !sublayers.is_empty() {
            let mut definition = Map::new();
            definition.insert(
                "version".to_string(),
                JsonValue::String(LAYER_DEFINITION_VERSION.to_string()),
            );
            definition.insert("layers".to_string(), JsonValue::Array(sublayers));
            layers.push(json!({
                "type": "layergroup",
                "options": { "layer_definition": definition },
            }));
        }
        layers.extend(torque_layers);
        debug!(
            "Built {} vizjson for visualization {} with {} layer(s)",
            Self::VERSION,
            visualization.id,
            layers.len()
        );

        let map = &visualization.map;
        Document::default()
            .with("id", &visualization.id)?
            .with("version", Self::VERSION)?
            .with("title", &visualization.title)?
            .with("description", &visualization.description)?
            .with("updated_at", visualization.updated_at)?
            .with("map_provider", &map.provider)?
            .with("bounds", map.bounds)?
            .with("center", map.center)?
            .with("zoom", map.zoom)?
            .with("layers", layers)?
            .with("vector", ctx.vector)
    }
}
