//! Graph snapshot cache.
//!
//! Building a navigation graph is the most expensive step of a query, and a
//! graph only changes when its road system or routing policy does. The cache
//! maps a key derived from both to a shared, immutable `Arc<NavigationGraph>`.
//!
//! ## Cache Key
//!
//! The key is an xxh64 hash over:
//! - road system fingerprint (canonical JSON hash)
//! - policy ID and `params_hash`
//! - schema version
//!
//! Any change to the road system or a policy parameter is a cache miss.
//!
//! The cache is an ordinary value owned by its caller; there is no process-wide
//! instance.

use std::hash::Hasher;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::RwLock;
use xxhash_rust::xxh64::Xxh64;

use crate::builder::GraphBuilder;
use crate::policy::RoutingPolicyV1;
use crate::types::{NavigationGraph, RoadSystem};
use crate::WAYFINDING_SCHEMA_VERSION;

/// Configuration for the graph cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of graphs kept.
    pub max_entries: usize,
    /// Whether to cache at all.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 16,
            enabled: true,
        }
    }
}

/// Cache key for a built graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphCacheKey(u64);

impl GraphCacheKey {
    /// Compute the key for a road system, given its fingerprint, under a policy.
    pub fn compute(system_fingerprint: &str, policy: &RoutingPolicyV1) -> Self {
        let mut hasher = Xxh64::new(0);
        hasher.write(system_fingerprint.as_bytes());
        hasher.write(policy.policy_id().as_bytes());
        hasher.write(policy.params_hash().as_bytes());
        hasher.write(WAYFINDING_SCHEMA_VERSION.as_bytes());
        Self(hasher.finish())
    }
}

/// A graph handed out by the cache.
#[derive(Debug, Clone)]
pub struct CachedGraph {
    /// The graph snapshot.
    pub graph: Arc<NavigationGraph>,
    /// Whether it came from the cache.
    pub cache_hit: bool,
}

/// LRU cache of built navigation graphs.
pub struct GraphCache {
    cache: Option<RwLock<LruCache<GraphCacheKey, Arc<NavigationGraph>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl GraphCache {
    /// Create a cache.
    pub fn new(config: CacheConfig) -> Self {
        let cache = config.enabled.then(|| {
            let size = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
            RwLock::new(LruCache::new(size))
        });
        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get the graph for `system` under `policy`, building it on a miss.
    ///
    /// Fingerprints `system` first; callers that already hold the fingerprint
    /// should use [`GraphCache::get_or_build_with_fingerprint`].
    pub fn get_or_build(&self, system: &RoadSystem, policy: &RoutingPolicyV1) -> CachedGraph {
        self.get_or_build_with_fingerprint(&system.fingerprint(), system, policy)
    }

    /// Get the graph for `system` under `policy`, keyed by the road system's
    /// precomputed `fingerprint`.
    pub fn get_or_build_with_fingerprint(
        &self,
        fingerprint: &str,
        system: &RoadSystem,
        policy: &RoutingPolicyV1,
    ) -> CachedGraph {
        let key = GraphCacheKey::compute(fingerprint, policy);

        if let Some(cache) = &self.cache {
            // Promote on hit; `get` needs the write lock.
            if let Some(graph) = cache.write().get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return CachedGraph {
                    graph: Arc::clone(graph),
                    cache_hit: true,
                };
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let graph = Arc::new(GraphBuilder::new(policy.clone()).build(system));
        if let Some(cache) = &self.cache {
            cache.write().put(key, Arc::clone(&graph));
        }
        CachedGraph {
            graph,
            cache_hit: false,
        }
    }

    /// Whether a graph for this key is cached, without touching recency.
    pub fn contains(&self, system: &RoadSystem, policy: &RoutingPolicyV1) -> bool {
        let key = GraphCacheKey::compute(&system.fingerprint(), policy);
        self.cache
            .as_ref()
            .map(|cache| cache.read().peek(&key).is_some())
            .unwrap_or(false)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (len, cap) = self
            .cache
            .as_ref()
            .map(|cache| {
                let cache = cache.read();
                (cache.len(), cache.cap().get())
            })
            .unwrap_or((0, 0));
        CacheStats {
            len,
            cap,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Drop every cached graph.
    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.write().clear();
        }
    }
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for GraphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCache").field("stats", &self.stats()).finish()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Current number of entries.
    pub len: usize,
    /// Maximum capacity (0 when disabled).
    pub cap: usize,
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that built a graph.
    pub misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Intersection, Position};

    fn system(lat: f64) -> RoadSystem {
        RoadSystem {
            outdoor_intersections: vec![Intersection {
                id: "a".into(),
                name: "A".into(),
                position: Position::new(lat, 0.0),
                connected_road_ids: vec![],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_hit_after_miss() {
        let cache = GraphCache::default();
        let policy = RoutingPolicyV1::default();

        let first = cache.get_or_build(&system(0.0), &policy);
        assert!(!first.cache_hit);
        let second = cache.get_or_build(&system(0.0), &policy);
        assert!(second.cache_hit);
        assert!(Arc::ptr_eq(&first.graph, &second.graph));

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.len), (1, 1, 1));
    }

    #[test]
    fn test_precomputed_fingerprint_shares_entries() {
        let cache = GraphCache::default();
        let policy = RoutingPolicyV1::default();
        let system = system(0.0);
        let fingerprint = system.fingerprint();

        let first = cache.get_or_build_with_fingerprint(&fingerprint, &system, &policy);
        assert!(!first.cache_hit);
        assert!(cache.get_or_build_with_fingerprint(&fingerprint, &system, &policy).cache_hit);
        assert!(cache.get_or_build(&system, &policy).cache_hit);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_changes_miss() {
        let cache = GraphCache::default();
        let policy = RoutingPolicyV1::default();
        cache.get_or_build(&system(0.0), &policy);

        assert!(!cache.get_or_build(&system(0.1), &policy).cache_hit);

        let tweaked = RoutingPolicyV1 { floor_height_m: 3.5, ..RoutingPolicyV1::default() };
        assert!(!cache.get_or_build(&system(0.0), &tweaked).cache_hit);
        assert_eq!(cache.stats().len, 3);
    }

    #[test]
    fn test_eviction_and_clear() {
        let cache = GraphCache::new(CacheConfig { max_entries: 1, enabled: true });
        let policy = RoutingPolicyV1::default();
        cache.get_or_build(&system(0.0), &policy);
        cache.get_or_build(&system(0.1), &policy);
        assert!(!cache.contains(&system(0.0), &policy));
        assert!(cache.contains(&system(0.1), &policy));

        cache.clear();
        assert_eq!(cache.stats().len, 0);
    }

    #[test]
    fn test_disabled_cache_always_builds() {
        let cache = GraphCache::new(CacheConfig { max_entries: 4, enabled: false });
        let policy = RoutingPolicyV1::default();
        cache.get_or_build(&system(0.0), &policy);
        assert!(!cache.get_or_build(&system(0.0), &policy).cache_hit);
        assert_eq!(cache.stats().cap, 0);
    }
}
