//! Configuration-related functionality.

use std::{collections::BTreeMap, path::Path, sync::Arc, time::Duration};

use eyre::{Result, WrapErr};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    cache::{MemoryCache, DEFAULT_MAX_CAPACITY},
    data::load_data,
    named_map::{NamedMapSources, StaticNamedMapSources},
    Error,
};

fn default_true() -> bool {
    true
}

fn default_max_capacity() -> u64 {
    DEFAULT_MAX_CAPACITY
}

/// Cache-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Lifetime of cached documents, in seconds. Unbounded if unset.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
    /// Maximum number of cached documents.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: None,
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

/// Presentation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    /// Layer id -> analysis node id, as known to the named-map backend.
    #[serde(default)]
    pub named_map_sources: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from the given file, if it exists. If it doesn't,
    /// the default configuration is returned.
    pub fn load<P: AsRef<Path>>(maybe_config_file: P) -> Result<Self> {
        let maybe_config_file = maybe_config_file.as_ref();
        debug!(
            "Attempting to load config file: {}",
            maybe_config_file.display()
        );
        if !maybe_config_file.exists() {
            debug!(
                "No such configuration file, using defaults: {}",
                maybe_config_file.display()
            );
            return Ok(Self::default());
        }
        let config_path = maybe_config_file.canonicalize()?;
        let config = load_data(&config_path)
            .wrap_err_with(|| Error::FailedToLoadConfig(config_path.clone()))?;
        debug!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }

    /// The cache described by this configuration, if caching is enabled.
    pub fn cache(&self) -> Option<MemoryCache> {
        if self.cache.enabled {
            Some(MemoryCache::bounded(
                self.cache.max_capacity,
                self.cache.ttl_secs.map(Duration::from_secs),
            ))
        } else {
            None
        }
    }

    /// The named-map source resolver described by this configuration.
    pub fn named_map_sources(&self) -> Arc<dyn NamedMapSources> {
        Arc::new(StaticNamedMapSources::new(self.named_map_sources.clone()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        builder::test::full_visualization, data::DataFormat, RenderingContext, VizJson3Builder,
        VizJsonBuilder,
    };

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load("no-such-config-for-tests.yml").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.cache.enabled);
        assert!(config.cache().is_some());
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("vizjson-config-{}.yml", std::process::id()));
        std::fs::write(
            &path,
            r#"
cache:
  ttl_secs: 30
  max_capacity: 5
named_map_sources:
  data: a1
"#,
        )
        .unwrap();
        let loaded = Config::load(&path);
        let _ = std::fs::remove_file(&path);
        let config = loaded.unwrap();

        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_secs, Some(30));
        assert_eq!(config.cache.max_capacity, 5);
        assert!(config.cache().is_some());

        // The configured sources reach named-map documents.
        let viz = full_visualization();
        let doc = VizJson3Builder::default()
            .with_named_map_sources(config.named_map_sources())
            .build(&viz, &RenderingContext::named_map())
            .unwrap();
        let options = &doc.layers()[1]["options"];
        assert_eq!(options["source"], serde_json::json!("a1"));
        assert!(options.get("sql").is_none());
    }

    #[test]
    fn malformed_file_fails_to_load() {
        let path = std::env::temp_dir().join(format!("vizjson-bad-config-{}.json", std::process::id()));
        std::fs::write(&path, "{ \"cache\": ").unwrap();
        let loaded = Config::load(&path);
        let _ = std::fs::remove_file(&path);
        let err = loaded.unwrap_err();
        assert!(format!("{}", err).contains("vizjson-bad-config"));
    }

    #[test]
    fn parse_yaml() {
        let config: Config = DataFormat::Yaml
            .parse(
                r#"
cache:
  enabled: false
named_map_sources:
  layer-1: a1
"#,
            )
            .unwrap();
        assert!(!config.cache.enabled);
        assert!(config.cache().is_none());
        assert_eq!(config.named_map_sources.get("layer-1").unwrap(), "a1");
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: Config = DataFormat::Json
            .parse(r#"{ "cache": { "ttl_secs": 60 } }"#)
            .unwrap();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_secs, Some(60));
        assert_eq!(config.cache.max_capacity, DEFAULT_MAX_CAPACITY);
        assert!(config.named_map_sources.is_empty());
    }
}
