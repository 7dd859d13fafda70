//! Core types for the wayfinding kernel.

pub mod geo;
pub mod entity;
pub mod graph;
pub mod route;
pub mod validation;

pub use geo::{Position, haversine_distance, initial_bearing, EARTH_RADIUS_M};
pub use entity::{RoadSystem, Building, Floor, Road, Landmark, Intersection, RoadType, LandmarkType};
pub use graph::{
    NavigationGraph, GraphNode, GraphEdge, GraphStats, NodeId, EdgeId, NodeKind,
    TransitionType, FloorInfo, NodeScope,
};
pub use route::{
    PathResult, NavigationRoute, FloorTransition, RouteInstruction, Maneuver,
    RouteSegment, StageKind,
};
pub use validation::{
    ValidationIssue, ValidationResult, NetworkStatistics, Severity, IssueCategory, IssueCode,
};
