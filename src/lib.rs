//! # wayfinding-kernel
//!
//! Deterministic pedestrian routing for mixed indoor/outdoor campus maps.
//!
//! The kernel answers one question:
//!
//! > Given two places on a campus, how does a person **walk** from one to the other,
//! > across floors and between buildings?
//!
//! ## Core Contract
//!
//! 1. Build a weighted navigation graph from a road-system entity model
//! 2. Search it with A*, honoring elevator/stairs preferences
//! 3. Compose multi-stage routes across floors and buildings
//! 4. Validate the network's structure independently of routing
//!
//! ## Architecture
//!
//! ```text
//! RoadSystem → GraphBuilder → NavigationGraph → Pathfinder → PathResult
//!      │                            │                ↑
//!      │                            │          RouteComposer → NavigationRoute
//!      │                            │                ↑
//!      └──────────────→ NetworkValidator      classify_route(NavigationContext)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same road system + same policy → identical graph fingerprint
//! - Node handles follow builder traversal order; keyed lookups use `BTreeMap`
//! - A built graph is immutable; rebuilding yields a new snapshot

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod policy;
pub mod builder;
pub mod instructions;
pub mod pathfinder;
pub mod context;
pub mod composer;
pub mod validator;
pub mod canonical;
pub mod cache;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{
    Position, RoadSystem, Building, Floor, Road, Landmark, Intersection, RoadType, LandmarkType,
    NavigationGraph, GraphNode, GraphEdge, GraphStats, NodeId, EdgeId, NodeKind, TransitionType,
    FloorInfo, NodeScope,
    PathResult, NavigationRoute, FloorTransition, RouteInstruction, Maneuver, RouteSegment, StageKind,
    ValidationIssue, ValidationResult, NetworkStatistics, Severity, IssueCategory, IssueCode,
};
pub use policy::{RoutingPolicyV1, TransitionPenalties};
pub use builder::{GraphBuilder, build_graph};
pub use pathfinder::{
    Pathfinder, PathOptions, PathError, Endpoint, ResolvedEndpoint, find_path,
    find_path_from_positions,
};
pub use context::{NavigationContext, RouteKind, classify_route};
pub use composer::{RouteComposer, ComposeError, compose_route};
pub use validator::{NetworkValidator, validate_network, connected_components};
pub use cache::{GraphCache, CacheConfig, CacheStats, CachedGraph};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};

/// Schema version for all wayfinding kernel types.
/// Increment on breaking changes to any schema type.
pub const WAYFINDING_SCHEMA_VERSION: &str = "1.0.0";

/// Default policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "routing_policy_v1";
