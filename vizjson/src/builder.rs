//! Document builders turn a visualization into a vizjson document of one
//! particular schema version.

use std::sync::Arc;

use log::{debug, warn};
use serde_json::{Map, Value as JsonValue};

use crate::{
    analysis::serialize_analyses,
    context::{RenderingContext, Variant},
    named_map::{NamedMapSources, NoNamedMapSources},
    redact::{LayerRedactor, VIZJSON3_RULES},
    Document, Error, Layer, LayerKind, Visualization,
};

/// Builds documents of a single schema version.
///
/// Builders must be deterministic: the same visualization and context always
/// produce the same document. Caching relies on it.
pub trait VizJsonBuilder {
    /// The schema version stamped on every document this builder produces.
    fn version(&self) -> &'static str;

    /// Build the full document for the given visualization.
    fn build(&self, visualization: &Visualization, ctx: &RenderingContext)
        -> Result<Document, Error>;
}

/// Builder for the current ("3.0.0") document schema.
#[derive(Clone, Default)]
pub struct VizJson3Builder {
    sources: Option<Arc<dyn NamedMapSources>>,
}

impl VizJson3Builder {
    pub const VERSION: &'static str = "3.0.0";

    /// Use the given named-map backend to resolve sources of layers lacking an
    /// explicit one.
    pub fn with_named_map_sources(mut self, sources: Arc<dyn NamedMapSources>) -> Self {
        self.sources = Some(sources);
        self
    }
}

impl VizJsonBuilder for VizJson3Builder {
    fn version(&self) -> &'static str {
        Self::VERSION
    }

    fn build(
        &self,
        visualization: &Visualization,
        ctx: &RenderingContext,
    ) -> Result<Document, Error> {
        let variant = ctx.effective_variant(visualization);
        let no_sources = NoNamedMapSources;
        let sources: &dyn NamedMapSources = match &self.sources {
            Some(s) => s.as_ref(),
            None => &no_sources,
        };
        let redactor = LayerRedactor::new(
            visualization,
            &VIZJSON3_RULES,
            sources,
            ctx.viewer.as_ref(),
        );
        let layers = visualization
            .layers
            .iter()
            .filter_map(|layer| present_layer(&redactor, layer, variant))
            .collect::<Vec<JsonValue>>();
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
            .with("scrollwheel", map.scrollwheel)?
            .with("layers", layers)?
            .with("analyses", serialize_analyses(&visualization.analyses))?
            .with("vector", ctx.vector)
    }
}

/// Renders a single layer as `{id, type, order, visible, options, ...}`, or
/// `None` if clients never get to see it.
fn present_layer(redactor: &LayerRedactor, layer: &Layer, variant: Variant) -> Option<JsonValue> {
    let client_type = match layer.kind.client_type() {
        Some(t) => t,
        None => {
            if let LayerKind::Other(kind) = &layer.kind {
                warn!(
                    "Dropping layer {} of unrecognized kind \"{}\"",
                    layer.id, kind
                );
            }
            return None;
        }
    };
    let options = redactor.redact(layer, variant)?;
    let mut presented = Map::new();
    presented.insert("id".to_string(), JsonValue::String(layer.id.clone()));
    presented.insert(
        "type".to_string(),
        JsonValue::String(client_type.to_string()),
    );
    presented.insert("order".to_string(), JsonValue::from(layer.order));
    presented.insert("visible".to_string(), JsonValue::Bool(layer.visible));
    presented.insert("options".to_string(), JsonValue::Object(options));
    if layer.kind.is_data() {
        if let Some(infowindow) = &layer.infowindow {
            presented.insert("infowindow".to_string(), infowindow.clone());
        }
        if let Some(tooltip) = &layer.tooltip {
            presented.insert("tooltip".to_string(), tooltip.clone());
        }
    }
    Some(JsonValue::Object(presented))
}
