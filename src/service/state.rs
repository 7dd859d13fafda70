//! Service state management.
//!
//! Holds the current road-system snapshot, the policy registry, and the graph
//! cache. The snapshot is an `Arc<RoadSystem>` swapped atomically on update;
//! in-flight requests keep the snapshot they started with.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheConfig, CachedGraph, GraphCache};
use crate::canonical::canonical_hash_hex;
use crate::policy::RoutingPolicyV1;
use crate::types::RoadSystem;

/// Error loading service state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Road system file could not be read.
    #[error("Failed to read road system: {0}")]
    Io(#[from] std::io::Error),
    /// Road system file is not valid JSON.
    #[error("Failed to parse road system: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reference to a registered policy by hash.
///
/// This enables hash-stable policy references across requests.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PolicyRef {
    /// Policy type identifier (e.g., "routing_policy_v1")
    pub policy_id: String,
    /// xxHash64 of quantized policy parameters
    pub params_hash: String,
}

impl PolicyRef {
    /// Create a policy reference from a RoutingPolicyV1.
    pub fn from_policy(policy: &RoutingPolicyV1) -> Self {
        Self {
            policy_id: policy.policy_id().to_string(),
            params_hash: policy.params_hash(),
        }
    }
}

/// Registry of immutable routing policies with stable hashes.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    policies: BTreeMap<PolicyRef, RoutingPolicyV1>,
    registry_fingerprint: String,
}

impl PolicyRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        let mut registry = Self {
            policies: BTreeMap::new(),
            registry_fingerprint: String::new(),
        };
        registry.update_fingerprint();
        registry
    }

    /// Create a registry with the default policy pre-registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(RoutingPolicyV1::default());
        registry
    }

    /// Register a policy and return its reference.
    ///
    /// Registering an equal policy again returns the existing reference.
    pub fn register(&mut self, policy: RoutingPolicyV1) -> PolicyRef {
        let policy_ref = PolicyRef::from_policy(&policy);
        if !self.policies.contains_key(&policy_ref) {
            self.policies.insert(policy_ref.clone(), policy);
            self.update_fingerprint();
        }
        policy_ref
    }

    /// Resolve a policy reference.
    pub fn resolve(&self, policy_ref: &PolicyRef) -> Option<&RoutingPolicyV1> {
        self.policies.get(policy_ref)
    }

    /// All registered references.
    pub fn list(&self) -> Vec<PolicyRef> {
        self.policies.keys().cloned().collect()
    }

    /// Registry fingerprint; changes whenever a policy is added.
    pub fn fingerprint(&self) -> &str {
        &self.registry_fingerprint
    }

    /// Number of registered policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    fn update_fingerprint(&mut self) {
        let refs: Vec<_> = self.policies.keys().collect();
        self.registry_fingerprint = canonical_hash_hex(&refs);
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// One immutable version of the served road system.
#[derive(Debug)]
pub struct RoadSystemSnapshot {
    /// The road system.
    pub road_system: RoadSystem,
    /// Its canonical fingerprint.
    pub fingerprint: String,
    /// When it was installed.
    pub loaded_at: DateTime<Utc>,
}

impl RoadSystemSnapshot {
    fn new(road_system: RoadSystem) -> Self {
        Self {
            fingerprint: road_system.fingerprint(),
            road_system,
            loaded_at: Utc::now(),
        }
    }
}

/// Shared service state.
#[derive(Clone)]
pub struct ServiceState {
    snapshot: Arc<RwLock<Arc<RoadSystemSnapshot>>>,
    /// Registry of available policies.
    pub policy_registry: Arc<RwLock<PolicyRegistry>>,
    /// Built graphs keyed by road system and policy.
    pub graph_cache: Arc<GraphCache>,
}

impl ServiceState {
    /// Create state serving `road_system` with the default policy registry.
    pub fn new(road_system: RoadSystem) -> Self {
        Self::with_registry(road_system, PolicyRegistry::with_defaults(), CacheConfig::default())
    }

    /// Create state with a custom policy registry and cache configuration.
    pub fn with_registry(road_system: RoadSystem, registry: PolicyRegistry, cache: CacheConfig) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(Arc::new(RoadSystemSnapshot::new(road_system)))),
            policy_registry: Arc::new(RwLock::new(registry)),
            graph_cache: Arc::new(GraphCache::new(cache)),
        }
    }

    /// Create state from environment variables.
    ///
    /// Reads the road system from `ROAD_SYSTEM_PATH` (JSON) and the cache size
    /// from `GRAPH_CACHE_SIZE`. Without a path the service starts empty.
    pub fn from_env() -> Result<Self, StateError> {
        let road_system = match std::env::var("ROAD_SYSTEM_PATH") {
            Ok(path) if !path.is_empty() => {
                let json = std::fs::read_to_string(&path)?;
                let road_system = RoadSystem::from_json_str(&json)?;
                tracing::info!(path = %path, buildings = road_system.buildings.len(), "road system loaded");
                road_system
            }
            _ => {
                tracing::warn!("ROAD_SYSTEM_PATH not set, starting with an empty road system");
                RoadSystem::default()
            }
        };
        let mut cache = CacheConfig::default();
        if let Some(size) = std::env::var("GRAPH_CACHE_SIZE").ok().and_then(|s| s.parse().ok()) {
            cache.max_entries = size;
        }
        Ok(Self::with_registry(road_system, PolicyRegistry::with_defaults(), cache))
    }

    /// The current road-system snapshot.
    pub fn snapshot(&self) -> Arc<RoadSystemSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Install a new road system. Returns its fingerprint.
    pub fn replace_road_system(&self, road_system: RoadSystem) -> String {
        let next = Arc::new(RoadSystemSnapshot::new(road_system));
        let fingerprint = next.fingerprint.clone();
        *self.snapshot.write() = next;
        tracing::info!(fingerprint = %fingerprint, "road system replaced");
        fingerprint
    }

    /// Resolve an optional policy reference; `None` means the default policy.
    pub fn resolve_policy(&self, policy_ref: Option<&PolicyRef>) -> Option<(RoutingPolicyV1, PolicyRef)> {
        match policy_ref {
            Some(pref) => self
                .policy_registry
                .read()
                .resolve(pref)
                .map(|policy| (policy.clone(), pref.clone())),
            None => {
                let policy = RoutingPolicyV1::default();
                let pref = PolicyRef::from_policy(&policy);
                Some((policy, pref))
            }
        }
    }

    /// The current snapshot and its graph under `policy`.
    pub fn graph(&self, policy: &RoutingPolicyV1) -> (Arc<RoadSystemSnapshot>, CachedGraph) {
        let snapshot = self.snapshot();
        let graph = self
            .graph_cache
            .get_or_build_with_fingerprint(&snapshot.fingerprint, &snapshot.road_system, policy);
        (snapshot, graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_registry_register() {
        let mut registry = PolicyRegistry::new();
        let ref1 = registry.register(RoutingPolicyV1::default());
        let ref2 = registry.register(RoutingPolicyV1::default());
        assert_eq!(ref1, ref2);
        assert_eq!(registry.len(), 1);
        assert_eq!(ref1.policy_id, "routing_policy_v1");
    }

    #[test]
    fn test_policy_registry_fingerprint_changes() {
        let mut registry = PolicyRegistry::with_defaults();
        let before = registry.fingerprint().to_string();
        registry.register(RoutingPolicyV1 { floor_height_m: 3.0, ..RoutingPolicyV1::default() });
        assert_ne!(registry.fingerprint(), before);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_snapshot_swap_keeps_old_readers() {
        let state = ServiceState::new(RoadSystem::default());
        let before = state.snapshot();
        let mut next = RoadSystem::default();
        next.outdoor_intersections.push(crate::types::Intersection {
            id: "x".into(),
            name: "X".into(),
            position: crate::types::Position::new(1.0, 1.0),
            connected_road_ids: vec![],
        });
        let fingerprint = state.replace_road_system(next);

        assert_ne!(before.fingerprint, fingerprint);
        assert!(before.road_system.outdoor_intersections.is_empty());
        assert_eq!(state.snapshot().fingerprint, fingerprint);
    }

    #[test]
    fn test_graph_cached_under_snapshot_fingerprint() {
        let state = ServiceState::new(RoadSystem::default());
        let policy = RoutingPolicyV1::default();
        let (snapshot, first) = state.graph(&policy);
        let (_, second) = state.graph(&policy);

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert!(Arc::ptr_eq(&first.graph, &second.graph));
        assert!(state.graph_cache.contains(&snapshot.road_system, &policy));
    }

    #[test]
    fn test_unknown_policy_ref() {
        let state = ServiceState::new(RoadSystem::default());
        let bogus = PolicyRef { policy_id: "routing_policy_v1".into(), params_hash: "0".into() };
        assert!(state.resolve_policy(Some(&bogus)).is_none());
        assert!(state.resolve_policy(None).is_some());
    }
}
