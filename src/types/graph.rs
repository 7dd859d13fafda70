//! Navigation graph: arena of nodes and directed edges.
//!
//! Nodes and edges are stored in flat `Vec`s and addressed by stable integer
//! handles (`NodeId`, `EdgeId`). Each node lists the handles of its outgoing
//! edges; no node holds a reference into another node. A built graph is an
//! immutable snapshot: mutation is crate-private and only the builder uses it.
//!
//! ## Determinism
//!
//! Handles are assigned in builder traversal order, keyed lookups use
//! `BTreeMap`, and outgoing edge lists are kept in insertion order, so the same
//! road system always yields the same graph and the same fingerprint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::entity::RoadType;
use super::geo::Position;
use crate::canonical::canonical_hash_hex;
use crate::policy::v1::quantize;

/// Handle of a node in a `NavigationGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Index into the node arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Handle of an edge in a `NavigationGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl EdgeId {
    /// Index into the edge arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a graph node was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An `Intersection` entity.
    Intersection,
    /// A `Landmark` entity.
    Landmark,
    /// A raw point of a road without two connected intersections.
    RoadPoint,
}

impl NodeKind {
    /// Whether the node is part of the walkable road network.
    pub fn is_walkable(&self) -> bool {
        matches!(self, Self::Intersection | Self::RoadPoint)
    }
}

/// Kind of floor-to-floor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    /// Elevator.
    Elevator,
    /// Stairs.
    Stairs,
    /// Escalator.
    Escalator,
    /// Ramp.
    Ramp,
    /// Vertical circulation of an unrecognised landmark type.
    Other,
}

impl TransitionType {
    /// Map a landmark type to the transition it provides.
    pub fn from_landmark_type(landmark_type: super::entity::LandmarkType) -> Self {
        use super::entity::LandmarkType;
        match landmark_type {
            LandmarkType::Elevator => Self::Elevator,
            LandmarkType::Stairs => Self::Stairs,
            LandmarkType::Escalator => Self::Escalator,
            LandmarkType::Ramp => Self::Ramp,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elevator => write!(f, "elevator"),
            Self::Stairs => write!(f, "stairs"),
            Self::Escalator => write!(f, "escalator"),
            Self::Ramp => write!(f, "ramp"),
            Self::Other => write!(f, "vertical connection"),
        }
    }
}

/// A node of the navigation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Arena handle.
    pub id: NodeId,
    /// Stable key: the entity ID, or `<roadId>#<pointIndex>` for road points.
    pub key: String,
    /// Display name of the source entity.
    pub name: String,
    /// Location.
    pub position: Position,
    /// Floor, absent outdoors.
    pub floor_id: Option<String>,
    /// Building, absent outdoors.
    pub building_id: Option<String>,
    /// Source entity kind.
    pub kind: NodeKind,
    /// Outgoing edge handles, in insertion order.
    pub(crate) out_edges: Vec<EdgeId>,
}

impl GraphNode {
    /// Outgoing edge handles.
    pub fn out_edges(&self) -> &[EdgeId] {
        &self.out_edges
    }

    /// Whether the node lies outside any building.
    pub fn is_outdoor(&self) -> bool {
        self.floor_id.is_none()
    }
}

/// A directed, weighted edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Arena handle.
    pub id: EdgeId,
    /// Source node.
    pub from: NodeId,
    /// Destination node.
    pub to: NodeId,
    /// Non-negative cost: meters, or an inflated cost for vertical transitions.
    pub weight: f64,
    /// Road this edge was derived from.
    pub road_id: Option<String>,
    /// Type of that road.
    pub road_type: Option<RoadType>,
    /// Whether the source road is one-way.
    pub is_one_way: bool,
    /// Floor-to-floor edge.
    pub is_vertical_transition: bool,
    /// Transition kind for vertical edges.
    pub transition_type: Option<TransitionType>,
    /// Positions from `from` to `to` inclusive, for rendering.
    pub waypoints: Vec<Position>,
    /// Free-form metadata (`link` = `road` | `landmark` | `access` | `entrance` | `vertical`).
    pub metadata: BTreeMap<String, String>,
}

impl GraphEdge {
    /// Create a plain edge with straight-line waypoints.
    pub fn new(from: NodeId, to: NodeId, weight: f64) -> Self {
        Self {
            id: EdgeId(0),
            from,
            to,
            weight: weight.max(0.0),
            road_id: None,
            road_type: None,
            is_one_way: false,
            is_vertical_transition: false,
            transition_type: None,
            waypoints: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// The same edge traversed in the opposite direction.
    pub fn reversed(&self) -> Self {
        let mut reverse = self.clone();
        reverse.from = self.to;
        reverse.to = self.from;
        reverse.waypoints.reverse();
        reverse
    }

    /// Attach a metadata entry.
    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Floor details needed for instruction text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorInfo {
    /// Floor ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Level number.
    pub level: i32,
    /// Owning building.
    pub building_id: String,
}

/// Which nodes a position may snap to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum NodeScope {
    /// Any node.
    Any,
    /// Only nodes outside buildings.
    Outdoor,
    /// Any node inside one building.
    Building {
        /// Building ID.
        building_id: String,
    },
    /// Nodes on one floor.
    Floor {
        /// Floor ID.
        floor_id: String,
    },
}

impl NodeScope {
    /// Whether a node falls inside this scope.
    pub fn contains(&self, node: &GraphNode) -> bool {
        match self {
            Self::Any => true,
            Self::Outdoor => node.is_outdoor(),
            Self::Building { building_id } => node.building_id.as_deref() == Some(building_id.as_str()),
            Self::Floor { floor_id } => node.floor_id.as_deref() == Some(floor_id.as_str()),
        }
    }
}

impl fmt::Display for NodeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Outdoor => write!(f, "outdoor"),
            Self::Building { building_id } => write!(f, "building {}", building_id),
            Self::Floor { floor_id } => write!(f, "floor {}", floor_id),
        }
    }
}

/// Summary counts of a built graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphStats {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of directed edges.
    pub edge_count: usize,
    /// Number of vertical-transition edges.
    pub vertical_edge_count: usize,
    /// Nodes with no incident edges.
    pub isolated_node_count: usize,
}

/// Immutable navigation graph snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    index: BTreeMap<String, NodeId>,
    floors: BTreeMap<String, FloorInfo>,
    /// Incoming edge handles, parallel to `nodes`.
    in_edges: Vec<Vec<EdgeId>>,
}

impl NavigationGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // ── crate-private construction ──────────────────────────────────────────

    /// Insert a node, or return the existing handle for the same key.
    pub(crate) fn insert_node(
        &mut self,
        key: String,
        name: String,
        position: Position,
        floor_id: Option<String>,
        building_id: Option<String>,
        kind: NodeKind,
    ) -> NodeId {
        if let Some(&existing) = self.index.get(&key) {
            return existing;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.index.insert(key.clone(), id);
        self.nodes.push(GraphNode {
            id,
            key,
            name,
            position,
            floor_id,
            building_id,
            kind,
            out_edges: Vec::new(),
        });
        self.in_edges.push(Vec::new());
        id
    }

    pub(crate) fn register_floor(&mut self, info: FloorInfo) {
        self.floors.insert(info.id.clone(), info);
    }

    /// Insert a directed edge.
    ///
    /// At most one edge exists per ordered (from, to) pair; a strictly lighter
    /// edge replaces the existing one in place, keeping its handle.
    /// Self loops are dropped and yield `None`.
    pub(crate) fn insert_edge(&mut self, mut edge: GraphEdge) -> Option<EdgeId> {
        if edge.from == edge.to {
            return None;
        }
        if let Some(existing) = self.find_edge(edge.from, edge.to) {
            let slot = &mut self.edges[existing.index()];
            if edge.weight < slot.weight {
                edge.id = existing;
                *slot = edge;
            }
            return Some(existing);
        }
        let id = EdgeId(self.edges.len() as u32);
        edge.id = id;
        self.nodes[edge.from.index()].out_edges.push(id);
        self.in_edges[edge.to.index()].push(id);
        self.edges.push(edge);
        Some(id)
    }

    /// Insert an edge and, unless `one_way`, its reverse with equal weight.
    pub(crate) fn insert_bidirectional(&mut self, edge: GraphEdge, one_way: bool) {
        let reverse = edge.reversed();
        self.insert_edge(edge);
        if !one_way {
            self.insert_edge(reverse);
        }
    }

    // ── read-only queries ───────────────────────────────────────────────────

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.index())
    }

    /// Look up an edge.
    pub fn edge(&self, id: EdgeId) -> Option<&GraphEdge> {
        self.edges.get(id.index())
    }

    /// Resolve a stable key (entity ID or road-point key) to a handle.
    pub fn node_id(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    /// Look up a node by stable key.
    pub fn node_by_key(&self, key: &str) -> Option<&GraphNode> {
        self.node_id(key).and_then(|id| self.node(id))
    }

    /// All nodes in handle order.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// All edges in handle order.
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Outgoing edges of a node.
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &GraphEdge> {
        self.nodes
            .get(id.index())
            .map(|n| n.out_edges.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |e| self.edges.get(e.index()))
    }

    /// Incoming edges of a node.
    pub fn incoming(&self, id: NodeId) -> impl Iterator<Item = &GraphEdge> {
        self.in_edges
            .get(id.index())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |e| self.edges.get(e.index()))
    }

    /// The edge from `from` to `to`, if any.
    pub fn find_edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.nodes
            .get(from.index())?
            .out_edges
            .iter()
            .copied()
            .find(|e| self.edges[e.index()].to == to)
    }

    /// Distinct nodes adjacent in either direction, sorted.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .outgoing(id)
            .map(|e| e.to)
            .chain(self.incoming(id).map(|e| e.from))
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Number of distinct adjacent nodes.
    pub fn degree(&self, id: NodeId) -> usize {
        self.neighbors(id).len()
    }

    /// Floor details.
    pub fn floor_info(&self, floor_id: &str) -> Option<&FloorInfo> {
        self.floors.get(floor_id)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nearest node to `position` within `scope`, with its distance.
    ///
    /// Ties are broken by the lower handle.
    pub fn nearest_node(&self, position: &Position, scope: &NodeScope) -> Option<(NodeId, f64)> {
        self.nodes
            .iter()
            .filter(|n| scope.contains(n))
            .map(|n| (n.id, n.position.distance_to(position)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
    }

    /// Summary counts.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            vertical_edge_count: self.edges.iter().filter(|e| e.is_vertical_transition).count(),
            isolated_node_count: self.nodes.iter().filter(|n| self.degree(n.id) == 0).count(),
        }
    }

    /// Deterministic fingerprint over node keys and quantized edge weights.
    ///
    /// Two graphs built from the same road system share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let nodes: Vec<&str> = self.nodes.iter().map(|n| n.key.as_str()).collect();
        let mut edges: Vec<(&str, &str, i64, bool)> = self
            .edges
            .iter()
            .map(|e| {
                (
                    self.nodes[e.from.index()].key.as_str(),
                    self.nodes[e.to.index()].key.as_str(),
                    quantize(e.weight),
                    e.is_vertical_transition,
                )
            })
            .collect();
        edges.sort();
        canonical_hash_hex(&(nodes, edges))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_two_nodes() -> (NavigationGraph, NodeId, NodeId) {
        let mut graph = NavigationGraph::new();
        let a = graph.insert_node("a".into(), "A".into(), Position::new(0.0, 0.0), None, None, NodeKind::Intersection);
        let b = graph.insert_node("b".into(), "B".into(), Position::new(0.001, 0.0), None, None, NodeKind::Intersection);
        (graph, a, b)
    }

    #[test]
    fn test_insert_node_is_idempotent_by_key() {
        let (mut graph, a, _) = graph_with_two_nodes();
        let again = graph.insert_node("a".into(), "A".into(), Position::new(1.0, 1.0), None, None, NodeKind::Landmark);
        assert_eq!(a, again);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_lighter_edge_replaces_heavier() {
        let (mut graph, a, b) = graph_with_two_nodes();
        let first = graph.insert_edge(GraphEdge::new(a, b, 10.0)).unwrap();
        let second = graph.insert_edge(GraphEdge::new(a, b, 4.0)).unwrap();
        assert_eq!(first, second);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge(first).unwrap().weight, 4.0);

        graph.insert_edge(GraphEdge::new(a, b, 7.0));
        assert_eq!(graph.edge(first).unwrap().weight, 4.0);
    }

    #[test]
    fn test_bidirectional_and_one_way() {
        let (mut graph, a, b) = graph_with_two_nodes();
        graph.insert_bidirectional(GraphEdge::new(a, b, 5.0), true);
        assert!(graph.find_edge(a, b).is_some());
        assert!(graph.find_edge(b, a).is_none());
        assert_eq!(graph.degree(a), 1);
        assert_eq!(graph.degree(b), 1);

        graph.insert_bidirectional(GraphEdge::new(a, b, 5.0), false);
        assert!(graph.find_edge(b, a).is_some());
        assert_eq!(graph.neighbors(a), vec![b]);
    }

    #[test]
    fn test_nearest_node_respects_scope() {
        let (mut graph, a, _) = graph_with_two_nodes();
        let indoor = graph.insert_node(
            "c".into(), "C".into(), Position::new(0.0005, 0.0),
            Some("f1".into()), Some("b1".into()), NodeKind::Landmark,
        );
        let probe = Position::new(0.0004, 0.0);
        assert_eq!(graph.nearest_node(&probe, &NodeScope::Any).map(|r| r.0), Some(indoor));
        assert_eq!(graph.nearest_node(&probe, &NodeScope::Outdoor).map(|r| r.0), Some(a));
        assert!(graph
            .nearest_node(&probe, &NodeScope::Floor { floor_id: "nope".into() })
            .is_none());
    }

    #[test]
    fn test_fingerprint_tracks_weights() {
        let (mut g1, a, b) = graph_with_two_nodes();
        let (mut g2, _, _) = graph_with_two_nodes();
        g1.insert_edge(GraphEdge::new(a, b, 5.0));
        g2.insert_edge(GraphEdge::new(a, b, 5.0));
        assert_eq!(g1.fingerprint(), g2.fingerprint());

        let (mut g3, _, _) = graph_with_two_nodes();
        g3.insert_edge(GraphEdge::new(a, b, 6.0));
        assert_ne!(g1.fingerprint(), g3.fingerprint());
    }
}
