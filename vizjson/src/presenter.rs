//! The vizjson presenter: picks the document variant, consults the cache and
//! applies per-request overlays.

use std::collections::HashSet;

use log::debug;

use crate::{
    builder::{VizJson3Builder, VizJsonBuilder},
    cache::{CacheKey, VizJsonCache},
    context::{RenderingContext, Variant, Viewer},
    legacy::LegacyBuilder,
    Document, Error, Visualization,
};

/// Presents a single visualization as vizjson documents of the schema
/// produced by `B`.
///
/// Retrieval happens in two phases. First, a base document is fetched from
/// the cache (or built), keyed by visualization id, named-map flag and schema
/// version only. Second, the `vector` flag requested by the caller is
/// overlaid on a copy of that document. The flag is therefore never part of
/// what gets cached.
pub struct VizJsonPresenter<'a, B = VizJson3Builder> {
    visualization: &'a Visualization,
    cache: Option<&'a dyn VizJsonCache>,
    viewer: Option<Viewer>,
    builder: B,
}

/// Presenter of current ("3.0.0") documents.
pub type VizJson3Presenter<'a> = VizJsonPresenter<'a, VizJson3Builder>;

/// Presenter of legacy ("0.1.0") documents.
pub type LegacyPresenter<'a> = VizJsonPresenter<'a, LegacyBuilder>;

impl<'a> VizJsonPresenter<'a, VizJson3Builder> {
    /// Constructor. Fails if the visualization is malformed.
    ///
    /// Without a cache, every call builds its document from scratch.
    pub fn new(
        visualization: &'a Visualization,
        cache: Option<&'a dyn VizJsonCache>,
    ) -> Result<Self, Error> {
        Self::with_builder(visualization, cache, VizJson3Builder::default())
    }
}

impl<'a> VizJsonPresenter<'a, LegacyBuilder> {
    /// Constructor for a presenter of legacy documents.
    pub fn legacy(
        visualization: &'a Visualization,
        cache: Option<&'a dyn VizJsonCache>,
    ) -> Result<Self, Error> {
        Self::with_builder(visualization, cache, LegacyBuilder)
    }
}

impl<'a, B: VizJsonBuilder> VizJsonPresenter<'a, B> {
    /// Constructor using an arbitrary document builder.
    pub fn with_builder(
        visualization: &'a Visualization,
        cache: Option<&'a dyn VizJsonCache>,
        builder: B,
    ) -> Result<Self, Error> {
        validate(visualization)?;
        Ok(Self {
            visualization,
            cache,
            viewer: None,
            builder,
        })
    }

    /// Sets the user on whose behalf documents are built.
    pub fn with_viewer(mut self, viewer: Viewer) -> Self {
        self.viewer = Some(viewer);
        self
    }

    /// The schema version of the documents produced by this presenter.
    pub fn version(&self) -> &'static str {
        self.builder.version()
    }

    /// The direct (anonymous) document.
    pub fn to_vizjson(&self, vector: bool) -> Result<Document, Error> {
        self.present(Variant::Direct, vector)
    }

    /// The named-map document.
    pub fn to_named_map_vizjson(&self, vector: bool) -> Result<Document, Error> {
        self.present(Variant::NamedMap, vector)
    }

    /// Builds a document without going anywhere near the cache.
    ///
    /// If `ctx` carries no viewer, this presenter's viewer is used.
    pub fn calculate_vizjson(&self, ctx: RenderingContext) -> Result<Document, Error> {
        let ctx = if ctx.viewer.is_none() {
            ctx.with_viewer(self.viewer.clone())
        } else {
            ctx
        };
        self.builder.build(self.visualization, &ctx)
    }

    fn present(&self, variant: Variant, vector: bool) -> Result<Document, Error> {
        let base_ctx = RenderingContext::new(variant);
        let base = match self.cache {
            Some(cache) => {
                let key = CacheKey::new(
                    &self.visualization.id,
                    variant.is_named(),
                    self.builder.version(),
                );
                cache.cached(&key, &mut || self.calculate_vizjson(base_ctx.clone()))?
            }
            None => {
                debug!(
                    "No cache configured, building vizjson for visualization {}",
                    self.visualization.id
                );
                self.calculate_vizjson(base_ctx)?
            }
        };
        Ok(overlay_vector(base, vector))
    }
}

/// Applies the per-request `vector` flag to a base document.
pub fn overlay_vector(mut document: Document, vector: bool) -> Document {
    document.set_vector(vector);
    document
}

fn validate(visualization: &Visualization) -> Result<(), Error> {
    let invalid = |reason: String| Error::InvalidVisualization(visualization.id.clone(), reason);
    if visualization.id.trim().is_empty() {
        return Err(invalid("missing id".to_string()));
    }
    let mut analysis_ids = HashSet::new();
    for analysis in &visualization.analyses {
        if analysis.id.trim().is_empty() {
            return Err(invalid("analysis without id".to_string()));
        }
        if !analysis_ids.insert(analysis.id.as_str()) {
            return Err(invalid(format!("duplicate analysis id {}", analysis.id)));
        }
    }
    if let Some(layer) = visualization.layers.iter().find(|l| l.id.trim().is_empty()) {
        return Err(invalid(format!("{:?} layer without id", layer.kind)));
    }
    Ok(())
}
