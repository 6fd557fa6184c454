//! Resolution of analysis sources by the named-map backend.
//!
//! When a data layer has no explicit `source`, the named-map backend may still
//! know which analysis node feeds it. That knowledge lives outside this crate,
//! so it is consulted through [`NamedMapSources`].

use std::collections::BTreeMap;

use crate::{Layer, Viewer, Visualization};

/// Supplies analysis node ids for layers rendered through a named map.
pub trait NamedMapSources: Send + Sync {
    /// Returns the analysis node id backing the given layer, if known.
    fn source_for(
        &self,
        visualization: &Visualization,
        layer: &Layer,
        viewer: Option<&Viewer>,
    ) -> Option<String>;
}

/// Resolves nothing. Layers without an explicit `source` get none.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNamedMapSources;

impl NamedMapSources for NoNamedMapSources {
    fn source_for(&self, _: &Visualization, _: &Layer, _: Option<&Viewer>) -> Option<String> {
        None
    }
}

/// A fixed mapping of layer ids to analysis node ids.
#[derive(Debug, Clone, Default)]
pub struct StaticNamedMapSources(BTreeMap<String, String>);

impl StaticNamedMapSources {
    pub fn new(sources: BTreeMap<String, String>) -> Self {
        Self(sources)
    }

    /// Convenience method for adding a single mapping.
    pub fn with<L, S>(mut self, layer_id: L, source: S) -> Self
    where
        L: AsRef<str>,
        S: AsRef<str>,
    {
        self.0
            .insert(layer_id.as_ref().to_string(), source.as_ref().to_string());
        self
    }
}

impl NamedMapSources for StaticNamedMapSources {
    fn source_for(&self, _: &Visualization, layer: &Layer, _: Option<&Viewer>) -> Option<String> {
        self.0.get(&layer.id).cloned()
    }
}
