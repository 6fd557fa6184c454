//! vizjson turns a fully loaded map visualization (its map, layers, analyses
//! and privacy settings) into the versioned JSON document consumed by
//! map-rendering clients, hiding whatever those clients must not see.
//!
//! This crate provides an API for embedding the presenter into another
//! application. For a command line interface, see the `vizjson-cli` crate.

pub mod analysis;
pub mod builder;
pub mod cache;
mod config;
mod context;
pub mod data;
mod datetime;
mod document;
mod error;
mod hash;
pub mod legacy;
mod model;
pub mod named_map;
mod presenter;
pub mod redact;
mod source;

pub use builder::{VizJson3Builder, VizJsonBuilder};
pub use cache::{CacheKey, CacheStore, MemoryCache, MemoryStore, StoreCache, VizJsonCache};
pub use config::{CacheConfig, Config};
pub use context::{ForcedPrivacy, RenderingContext, Variant, Viewer};
pub use datetime::DateTime;
pub use document::Document;
pub use error::Error;
pub use legacy::LegacyBuilder;
pub use model::{
    Analysis, Layer, LayerKind, MapInfo, Privacy, TablePrivacy, UserTable, Visualization,
};
pub use presenter::{overlay_vector, LegacyPresenter, VizJson3Presenter, VizJsonPresenter};
pub use source::{SourceIter, VisualizationSource};
