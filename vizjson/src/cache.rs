//! Caching of base vizjson documents.
//!
//! ```text
//! VizJsonCache (trait)           <- what the presenter talks to
//!   └── StoreCache<S>            <- cache-aside over any string store
//!         └── S: CacheStore
//!               └── MemoryStore  <- in-process (moka), bounded, optional TTL
//! ```
//!
//! Cached documents are a pure function of (visualization id, named-map flag,
//! schema version). Request overlays such as the `vector` flag are applied by
//! the caller after retrieval and never reach the cache.

use std::time::Duration;

use log::debug;

use crate::{Document, Error};

/// Identifies one cached base document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub visualization_id: String,
    pub named: bool,
    pub version: String,
}

impl CacheKey {
    /// Constructor.
    pub fn new<I, V>(visualization_id: I, named: bool, version: V) -> Self
    where
        I: AsRef<str>,
        V: AsRef<str>,
    {
        Self {
            visualization_id: visualization_id.as_ref().to_string(),
            named,
            version: version.as_ref().to_string(),
        }
    }

    /// The prefix shared by the keys of every version and variant of a
    /// visualization. Ids are escaped so that no id's prefix is a prefix of
    /// another id's keys.
    pub fn prefix_for(visualization_id: &str) -> String {
        format!("visualization:{}:vizjson:", escape_id(visualization_id))
    }

    /// The key under which this document is stored, e.g.
    /// `visualization:<id>:vizjson:3.0.0:named`.
    pub fn storage_key(&self) -> String {
        format!(
            "{}{}{}",
            Self::prefix_for(&self.visualization_id),
            self.version,
            if self.named { ":named" } else { "" }
        )
    }
}

/// Escapes `%` and `:` so ids cannot forge key separators.
fn escape_id(id: &str) -> String {
    id.replace('%', "%25").replace(':', "%3A")
}

/// Cache-aside access to base documents.
///
/// Implementations need not guard against concurrent misses on the same key:
/// both callers may compute and store, and the last write wins. Backend
/// failures are returned to the caller, never swallowed.
pub trait VizJsonCache: Send + Sync {
    /// Returns the document stored under `key`, computing and storing it on a
    /// miss.
    fn cached(
        &self,
        key: &CacheKey,
        compute: &mut dyn FnMut() -> Result<Document, Error>,
    ) -> Result<Document, Error>;

    /// Drops every cached document of the given visualization, across all
    /// versions and variants.
    fn invalidate(&self, visualization_id: &str) -> Result<(), Error>;
}

/// A raw string key/value store backing a [`StoreCache`].
pub trait CacheStore: Send + Sync {
    /// Returns `Ok(Some(value))` on a hit, `Ok(None)` on a miss.
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Deletes every key starting with `prefix`, returning how many were
    /// deleted.
    fn delete_prefix(&self, prefix: &str) -> Result<u64, Error>;

    fn provider_name(&self) -> &'static str;
}

/// Cache-aside adapter storing documents as JSON strings in a [`CacheStore`].
#[derive(Debug, Default)]
pub struct StoreCache<S> {
    store: S,
}

impl<S: CacheStore> StoreCache<S> {
    /// Constructor.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: CacheStore> VizJsonCache for StoreCache<S> {
    fn cached(
        &self,
        key: &CacheKey,
        compute: &mut dyn FnMut() -> Result<Document, Error>,
    ) -> Result<Document, Error> {
        let storage_key = key.storage_key();
        if let Some(payload) = self.store.get(&storage_key)? {
            debug!(
                "Cache HIT ({}) for {}",
                self.store.provider_name(),
                storage_key
            );
            return serde_json::from_str(&payload)
                .map_err(|e| Error::CachePayload(storage_key, e));
        }
        debug!(
            "Cache MISS ({}) for {}",
            self.store.provider_name(),
            storage_key
        );
        // No lock is held while computing.
        let document = compute()?;
        self.store.set(&storage_key, &document.to_json_string()?)?;
        debug!(
            "Cache SET ({}) for {}",
            self.store.provider_name(),
            storage_key
        );
        Ok(document)
    }

    fn invalidate(&self, visualization_id: &str) -> Result<(), Error> {
        let deleted = self
            .store
            .delete_prefix(&CacheKey::prefix_for(visualization_id))?;
        debug!(
            "Invalidated {} cached document(s) of visualization {}",
            deleted, visualization_id
        );
        Ok(())
    }
}

/// Entry bound of a [`MemoryStore`] when none is configured.
pub const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// In-process [`CacheStore`] backed by Moka.
///
/// Holds at most `max_capacity` entries, which expire after the configured
/// TTL, if any. This store is NOT shared between processes.
#[derive(Clone)]
pub struct MemoryStore {
    cache: moka::sync::Cache<String, String>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("max_capacity", &self.cache.policy().max_capacity())
            .field("time_to_live", &self.cache.policy().time_to_live())
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MemoryStore {
    /// A store bounded by [`DEFAULT_MAX_CAPACITY`] entries.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY, ttl)
    }

    /// A store holding at most `max_capacity` entries.
    pub fn with_capacity(max_capacity: u64, ttl: Option<Duration>) -> Self {
        let builder = moka::sync::Cache::builder().max_capacity(max_capacity);
        let cache = match ttl {
            Some(ttl) => builder.time_to_live(ttl).build(),
            None => builder.build(),
        };
        debug!(
            "Memory cache store created (max_capacity: {}, ttl: {:?})",
            max_capacity, ttl
        );
        Self { cache }
    }

    /// Number of live entries, after expired and evicted ones are reclaimed.
    pub fn len(&self) -> usize {
        self.cache.run_pending_tasks();
        self.cache.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.cache.get(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.cache.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_prefix(&self, prefix: &str) -> Result<u64, Error> {
        let keys = self
            .cache
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k)
            .collect::<Vec<_>>();
        for key in &keys {
            self.cache.invalidate(key.as_str());
        }
        Ok(keys.len() as u64)
    }

    fn provider_name(&self) -> &'static str {
        "moka"
    }
}

/// Convenience alias for the default in-process cache.
pub type MemoryCache = StoreCache<MemoryStore>;

impl MemoryCache {
    /// An in-process cache whose entries expire after `ttl`, if given.
    pub fn in_memory(ttl: Option<Duration>) -> Self {
        StoreCache::new(MemoryStore::new(ttl))
    }

    /// An in-process cache holding at most `max_capacity` documents.
    pub fn bounded(max_capacity: u64, ttl: Option<Duration>) -> Self {
        StoreCache::new(MemoryStore::with_capacity(max_capacity, ttl))
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use serde_json::json;

    fn document(n: u64) -> Document {
        Document::default()
            .with("version", "3.0.0")
            .unwrap()
            .with("n", n)
            .unwrap()
    }

    /// A store whose backend is always down.
    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn get(&self, key: &str) -> Result<Option<String>, Error> {
            Err(Error::cache(key, "connection refused", true))
        }

        fn set(&self, key: &str, _value: &str) -> Result<(), Error> {
            Err(Error::cache(key, "connection refused", true))
        }

        fn delete_prefix(&self, prefix: &str) -> Result<u64, Error> {
            Err(Error::cache(prefix, "connection refused", true))
        }

        fn provider_name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn storage_keys() {
        assert_eq!(
            CacheKey::new("v1", false, "3.0.0").storage_key(),
            "visualization:v1:vizjson:3.0.0"
        );
        assert_eq!(
            CacheKey::new("v1", true, "0.1.0").storage_key(),
            "visualization:v1:vizjson:0.1.0:named"
        );
        assert_ne!(
            CacheKey::new("v1", false, "3.0.0").storage_key(),
            CacheKey::new("v1", false, "0.1.0").storage_key()
        );
    }

    #[test]
    fn computes_once_per_key() {
        let cache = MemoryCache::in_memory(None);
        let computed = AtomicUsize::new(0);
        let key = CacheKey::new("v1", false, "3.0.0");
        for _ in 0..3 {
            let doc = cache
                .cached(&key, &mut || {
                    computed.fetch_add(1, Ordering::SeqCst);
                    Ok(document(1))
                })
                .unwrap();
            assert_eq!(doc, document(1));
        }
        assert_eq!(computed.load(Ordering::SeqCst), 1);

        // Different flag, different entry.
        let named = cache
            .cached(&CacheKey::new("v1", true, "3.0.0"), &mut || Ok(document(2)))
            .unwrap();
        assert_eq!(named, document(2));
        assert_eq!(cache.store().len(), 2);
    }

    #[test]
    fn invalidation_covers_all_variants_of_one_visualization() {
        let cache = MemoryCache::in_memory(None);
        for (id, named, version) in [
            ("v1", false, "3.0.0"),
            ("v1", true, "3.0.0"),
            ("v1", false, "0.1.0"),
            ("v2", false, "3.0.0"),
        ] {
            cache
                .cached(&CacheKey::new(id, named, version), &mut || Ok(document(0)))
                .unwrap();
        }
        cache.invalidate("v1").unwrap();
        assert_eq!(cache.store().len(), 1);
        let recomputed = cache
            .cached(&CacheKey::new("v1", false, "3.0.0"), &mut || Ok(document(9)))
            .unwrap();
        assert_eq!(recomputed.get("n").unwrap(), &json!(9));
    }

    #[test]
    fn ids_containing_separators_do_not_alias() {
        let cache = MemoryCache::in_memory(None);
        let plain = CacheKey::new("v1", false, "3.0.0");
        let tricky = CacheKey::new("v1:vizjson", false, "3.0.0");
        assert!(!tricky
            .storage_key()
            .starts_with(&CacheKey::prefix_for("v1")));
        assert!(!plain
            .storage_key()
            .starts_with(&CacheKey::prefix_for("v1:vizjson")));
        cache.cached(&plain, &mut || Ok(document(1))).unwrap();
        cache.cached(&tricky, &mut || Ok(document(2))).unwrap();

        cache.invalidate("v1").unwrap();
        assert_eq!(cache.store().len(), 1);
        assert_eq!(
            cache.cached(&tricky, &mut || Ok(document(3))).unwrap(),
            document(2)
        );
    }

    #[test]
    fn expired_entries_are_recomputed() {
        let cache = MemoryCache::in_memory(Some(Duration::from_millis(20)));
        let key = CacheKey::new("v1", false, "3.0.0");
        cache.cached(&key, &mut || Ok(document(1))).unwrap();
        std::thread::sleep(Duration::from_millis(60));
        let doc = cache.cached(&key, &mut || Ok(document(2))).unwrap();
        assert_eq!(doc, document(2));
    }

    #[test]
    fn expired_entries_are_reclaimed() {
        let store = MemoryStore::new(Some(Duration::from_millis(10)));
        for i in 0..1000 {
            store.set(&format!("k{}", i), "v").unwrap();
        }
        std::thread::sleep(Duration::from_millis(50));
        store.set("fresh", "v").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("fresh").unwrap(), Some("v".to_string()));
        assert_eq!(store.get("k0").unwrap(), None);
    }

    #[test]
    fn capacity_is_bounded() {
        let store = MemoryStore::with_capacity(2, None);
        for i in 0..10 {
            store.set(&format!("k{}", i), "v").unwrap();
        }
        assert!(store.len() <= 2);
    }

    #[test]
    fn compute_errors_are_not_stored() {
        let cache = MemoryCache::in_memory(None);
        let key = CacheKey::new("v1", false, "3.0.0");
        let result = cache.cached(&key, &mut || {
            Err(Error::InvalidVisualization("v1".to_string(), "broken".to_string()))
        });
        assert!(result.is_err());
        assert!(cache.store().is_empty());
    }

    #[test]
    fn backend_failures_propagate() {
        let cache = StoreCache::new(BrokenStore);
        let computed = AtomicUsize::new(0);
        let err = cache
            .cached(&CacheKey::new("v1", false, "3.0.0"), &mut || {
                computed.fetch_add(1, Ordering::SeqCst);
                Ok(document(1))
            })
            .unwrap_err();
        assert!(err.is_retryable());
        // No silent fallback to computation.
        assert_eq!(computed.load(Ordering::SeqCst), 0);
        assert!(cache.invalidate("v1").is_err());
    }

    #[test]
    fn corrupt_payloads_are_reported() {
        let cache = MemoryCache::in_memory(None);
        let key = CacheKey::new("v1", false, "3.0.0");
        cache.store().set(&key.storage_key(), "not json").unwrap();
        match cache.cached(&key, &mut || Ok(document(1))) {
            Err(Error::CachePayload(k, _)) => assert_eq!(k, key.storage_key()),
            other => panic!("expected a payload error, but got {:?}", other),
        }
    }

    #[test]
    fn concurrent_misses_converge() {
        let cache = MemoryCache::in_memory(None);
        let key = CacheKey::new("v1", false, "3.0.0");
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let doc = cache.cached(&key, &mut || Ok(document(7))).unwrap();
                    assert_eq!(doc, document(7));
                });
            }
        });
        assert_eq!(cache.store().len(), 1);
        assert_eq!(
            cache.cached(&key, &mut || Ok(document(8))).unwrap(),
            document(7)
        );
    }
}
