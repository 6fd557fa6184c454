use log::trace;

use crate::Visualization;

/// Which flavour of document is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Clients query the data directly, so raw SQL/CartoCSS are exposed.
    /// Also known as "anonymous".
    Direct,
    /// Query execution is delegated to a server-side named map, so raw
    /// SQL/CartoCSS are hidden.
    NamedMap,
}

impl Variant {
    pub fn is_named(&self) -> bool {
        matches!(self, Self::NamedMap)
    }
}

/// An explicit override of the variant otherwise implied by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForcedPrivacy {
    ForceNamed,
    ForceAnonymous,
}

/// Identity of the user looking at a visualization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Viewer {
    pub username: String,
}

impl Viewer {
    pub fn new<S: AsRef<str>>(username: S) -> Self {
        Self {
            username: username.as_ref().to_string(),
        }
    }
}

/// Execution context for a single document build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderingContext {
    pub variant: Variant,
    pub forced_privacy: Option<ForcedPrivacy>,
    pub vector: bool,
    pub viewer: Option<Viewer>,
}

impl Default for RenderingContext {
    fn default() -> Self {
        Self::new(Variant::Direct)
    }
}

impl RenderingContext {
    /// Constructor.
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            forced_privacy: None,
            vector: false,
            viewer: None,
        }
    }

    pub fn named_map() -> Self {
        Self::new(Variant::NamedMap)
    }

    pub fn with_forced_privacy(mut self, forced: ForcedPrivacy) -> Self {
        self.forced_privacy = Some(forced);
        self
    }

    pub fn with_vector(mut self, vector: bool) -> Self {
        self.vector = vector;
        self
    }

    pub fn with_viewer(mut self, viewer: Option<Viewer>) -> Self {
        self.viewer = viewer;
        self
    }

    /// Resolves the variant whose redaction rules actually apply.
    ///
    /// A forced override always wins. Otherwise a direct request for a
    /// visualization that can only be served through a named map is rendered
    /// as a named map.
    pub fn effective_variant(&self, visualization: &Visualization) -> Variant {
        let variant = match self.forced_privacy {
            Some(ForcedPrivacy::ForceNamed) => Variant::NamedMap,
            Some(ForcedPrivacy::ForceAnonymous) => Variant::Direct,
            None if visualization.needs_named_map() => Variant::NamedMap,
            None => self.variant,
        };
        trace!(
            "Visualization {} requested as {:?} (forced: {:?}) renders as {:?}",
            visualization.id,
            self.variant,
            self.forced_privacy,
            variant
        );
        variant
    }
}
