//! A* pathfinder over a built navigation graph.
//!
//! The search uses a `BinaryHeap` frontier ordered by `f = g + h`, where `h`
//! is the great-circle distance to the goal. Vertical-transition edges are
//! re-weighted by the caller's elevator preference (see
//! [`adjusted_weight`](crate::policy::adjusted_weight)).
//!
//! ## Failure modes
//!
//! Searches never return a partial path. An unknown node yields
//! [`PathError::NodeNotFound`], an unreachable goal yields
//! [`PathError::NoPathFound`], and a position with no node in its scope yields
//! [`PathError::NoNearbyNode`].

use std::collections::{BTreeSet, BinaryHeap};

use serde::{Deserialize, Serialize};

use crate::context::NavigationContext;
use crate::instructions::{floor_transitions, generate_instructions};
use crate::policy::{adjusted_weight, RoutingPolicyV1, SearchCandidate};
use crate::types::{
    EdgeId, NavigationGraph, NodeId, NodeScope, PathResult, Position, TransitionType,
};

/// Error type for pathfinding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    /// Start or goal is not in the graph.
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    /// Goal is unreachable from start.
    #[error("No path found from {from} to {to}")]
    NoPathFound {
        /// Start node key.
        from: String,
        /// Goal node key.
        to: String,
    },
    /// A position could not be snapped to any node.
    #[error("No graph node available in scope {scope}")]
    NoNearbyNode {
        /// Scope that was searched.
        scope: NodeScope,
    },
}

/// Per-query search options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathOptions {
    /// Penalize non-elevator transitions instead of elevators.
    #[serde(default)]
    pub prefer_elevator: bool,
    /// Never use stairs.
    #[serde(default)]
    pub avoid_stairs: bool,
    /// Nodes the search may not enter. Start and goal are always allowed.
    #[serde(default)]
    pub excluded: BTreeSet<NodeId>,
}

impl PathOptions {
    /// Options with an elevator preference.
    pub fn prefer_elevator(prefer_elevator: bool) -> Self {
        Self { prefer_elevator, ..Self::default() }
    }

    /// Add excluded nodes.
    pub fn excluding(mut self, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        self.excluded.extend(nodes);
        self
    }
}

/// Start or goal of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Endpoint {
    /// A graph node.
    Node {
        /// Node handle.
        id: NodeId,
    },
    /// A geographic position, snapped to the nearest node in `scope`.
    Position {
        /// Where the traveller is.
        position: Position,
        /// Which nodes it may snap to.
        scope: NodeScope,
    },
}

/// An endpoint resolved to a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedEndpoint {
    /// Node the search starts or ends at.
    pub node: NodeId,
    /// Straight-line distance from the original position to the node.
    pub offset_m: f64,
    /// Original position, when the endpoint was one.
    pub position: Option<Position>,
}

/// A* pathfinder bound to one graph snapshot.
#[derive(Debug, Clone)]
pub struct Pathfinder<'g> {
    graph: &'g NavigationGraph,
    policy: RoutingPolicyV1,
}

impl<'g> Pathfinder<'g> {
    /// Create a pathfinder with the default policy.
    pub fn new(graph: &'g NavigationGraph) -> Self {
        Self::with_policy(graph, RoutingPolicyV1::default())
    }

    /// Create a pathfinder with a policy.
    pub fn with_policy(graph: &'g NavigationGraph, policy: RoutingPolicyV1) -> Self {
        Self { graph, policy }
    }

    /// Get the graph.
    pub fn graph(&self) -> &'g NavigationGraph {
        self.graph
    }

    /// Get the policy.
    pub fn policy(&self) -> &RoutingPolicyV1 {
        &self.policy
    }

    /// Find a path between two nodes identified by stable key.
    pub fn find_path(&self, from: &str, to: &str, options: &PathOptions) -> Result<PathResult, PathError> {
        let start = self
            .graph
            .node_id(from)
            .ok_or_else(|| PathError::NodeNotFound(from.to_string()))?;
        let goal = self
            .graph
            .node_id(to)
            .ok_or_else(|| PathError::NodeNotFound(to.to_string()))?;
        self.find_path_between(start, goal, options)
    }

    /// Find a path between two node handles.
    pub fn find_path_between(
        &self,
        start: NodeId,
        goal: NodeId,
        options: &PathOptions,
    ) -> Result<PathResult, PathError> {
        let goal_position = self
            .graph
            .node(goal)
            .map(|n| n.position)
            .ok_or_else(|| PathError::NodeNotFound(goal.to_string()))?;
        if self.graph.node(start).is_none() {
            return Err(PathError::NodeNotFound(start.to_string()));
        }

        let n = self.graph.node_count();
        let mut g_score = vec![f64::INFINITY; n];
        let mut parent: Vec<Option<EdgeId>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut frontier = BinaryHeap::new();
        let mut seq = 0u64;
        let mut expanded = 0usize;

        let heuristic = |node: NodeId| {
            self.graph
                .node(node)
                .map(|n| n.position.distance_to(&goal_position))
                .unwrap_or(0.0)
        };

        g_score[start.index()] = 0.0;
        frontier.push(SearchCandidate::new(start, 0.0, heuristic(start), seq));

        while let Some(current) = frontier.pop() {
            let index = current.node.index();
            if closed[index] || current.g > g_score[index] {
                continue;
            }
            closed[index] = true;
            expanded += 1;

            if current.node == goal {
                return Ok(self.reconstruct(start, goal, &parent, current.g, expanded));
            }

            for edge in self.graph.outgoing(current.node) {
                let next = edge.to;
                if closed[next.index()] {
                    continue;
                }
                if next != goal && options.excluded.contains(&next) {
                    continue;
                }
                if options.avoid_stairs
                    && edge.is_vertical_transition
                    && edge.transition_type == Some(TransitionType::Stairs)
                {
                    continue;
                }
                let tentative = current.g + adjusted_weight(edge, options.prefer_elevator, &self.policy);
                if tentative < g_score[next.index()] {
                    g_score[next.index()] = tentative;
                    parent[next.index()] = Some(edge.id);
                    seq += 1;
                    frontier.push(SearchCandidate::new(next, tentative, heuristic(next), seq));
                }
            }
        }

        tracing::debug!(start = %self.key(start), goal = %self.key(goal), expanded, "no path found");
        Err(PathError::NoPathFound { from: self.key(start), to: self.key(goal) })
    }

    /// Resolve an endpoint to a node.
    pub fn resolve(&self, endpoint: &Endpoint) -> Result<ResolvedEndpoint, PathError> {
        match endpoint {
            Endpoint::Node { id } => {
                self.graph
                    .node(*id)
                    .ok_or_else(|| PathError::NodeNotFound(id.to_string()))?;
                Ok(ResolvedEndpoint { node: *id, offset_m: 0.0, position: None })
            }
            Endpoint::Position { position, scope } => {
                let (node, offset_m) = self
                    .graph
                    .nearest_node(position, scope)
                    .ok_or_else(|| PathError::NoNearbyNode { scope: scope.clone() })?;
                Ok(ResolvedEndpoint { node, offset_m, position: Some(*position) })
            }
        }
    }

    /// Find a path between two endpoints.
    ///
    /// Position endpoints add their snap offset to `total_distance` and their
    /// original position to the ends of `waypoints`.
    pub fn find_path_endpoints(
        &self,
        from: &Endpoint,
        to: &Endpoint,
        options: &PathOptions,
    ) -> Result<PathResult, PathError> {
        let start = self.resolve(from)?;
        let goal = self.resolve(to)?;
        let mut result = self.find_path_between(start.node, goal.node, options)?;

        let offset = start.offset_m + goal.offset_m;
        result.total_distance += offset;
        result.total_cost += offset;
        if let Some(position) = start.position.filter(|_| start.offset_m > 0.0) {
            result.waypoints.insert(0, position);
        }
        if let Some(position) = goal.position.filter(|_| goal.offset_m > 0.0) {
            result.waypoints.push(position);
        }
        Ok(result)
    }

    /// Find a path between two positions.
    ///
    /// Each position snaps within its floor when the context names one, else
    /// within its building, else to any node.
    pub fn find_path_from_positions(
        &self,
        from: Position,
        to: Position,
        context: &NavigationContext,
        options: &PathOptions,
    ) -> Result<PathResult, PathError> {
        let from = Endpoint::Position {
            position: from,
            scope: scope_for(context.start_floor_id.as_deref(), context.start_building_id.as_deref()),
        };
        let to = Endpoint::Position {
            position: to,
            scope: scope_for(context.end_floor_id.as_deref(), context.end_building_id.as_deref()),
        };
        self.find_path_endpoints(&from, &to, options)
    }

    /// Path that visits `nodes` in order over the direct edge between each
    /// consecutive pair.
    ///
    /// Fails with [`PathError::NoPathFound`] at the first pair with no edge.
    pub fn path_along(&self, nodes: &[NodeId], options: &PathOptions) -> Result<PathResult, PathError> {
        let Some(&start) = nodes.first() else {
            return Err(PathError::NodeNotFound("empty node sequence".to_string()));
        };
        if self.graph.node(start).is_none() {
            return Err(PathError::NodeNotFound(start.to_string()));
        }
        let mut edges = Vec::with_capacity(nodes.len().saturating_sub(1));
        let mut cost = 0.0;
        for pair in nodes.windows(2) {
            let edge = self
                .graph
                .find_edge(pair[0], pair[1])
                .and_then(|id| self.graph.edge(id))
                .ok_or_else(|| PathError::NoPathFound {
                    from: self.key(pair[0]),
                    to: self.key(pair[1]),
                })?;
            cost += adjusted_weight(edge, options.prefer_elevator, &self.policy);
            edges.push(edge.id);
        }
        Ok(self.assemble(start, edges, cost, 0))
    }

    fn key(&self, id: NodeId) -> String {
        self.graph
            .node(id)
            .map(|n| n.key.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn reconstruct(
        &self,
        start: NodeId,
        goal: NodeId,
        parent: &[Option<EdgeId>],
        cost: f64,
        expanded: usize,
    ) -> PathResult {
        let mut edges = Vec::new();
        let mut cursor = goal;
        while cursor != start {
            let Some(edge) = parent[cursor.index()].and_then(|id| self.graph.edge(id)) else {
                break;
            };
            edges.push(edge.id);
            cursor = edge.from;
        }
        edges.reverse();
        self.assemble(start, edges, cost, expanded)
    }

    fn assemble(&self, start: NodeId, edges: Vec<EdgeId>, cost: f64, expanded: usize) -> PathResult {
        let mut nodes = vec![start];
        let mut waypoints: Vec<Position> = self.graph.node(start).map(|n| n.position).into_iter().collect();
        let mut total_distance = 0.0;
        for edge in edges.iter().filter_map(|id| self.graph.edge(*id)) {
            nodes.push(edge.to);
            total_distance += edge.weight;
            let fallback: Vec<Position>;
            let points = if edge.waypoints.is_empty() {
                fallback = [edge.from, edge.to]
                    .iter()
                    .filter_map(|id| self.graph.node(*id).map(|n| n.position))
                    .collect();
                &fallback
            } else {
                &edge.waypoints
            };
            for point in points {
                if waypoints.last() != Some(point) {
                    waypoints.push(*point);
                }
            }
        }

        tracing::debug!(hops = edges.len(), total_distance, expanded, "path found");

        PathResult {
            instructions: generate_instructions(self.graph, &nodes, &edges, &self.policy),
            floor_transitions: floor_transitions(self.graph, &edges),
            nodes,
            edges,
            waypoints,
            total_distance,
            total_cost: cost,
            nodes_expanded: expanded,
        }
    }
}

/// Snap scope for an optional floor and building.
pub fn scope_for(floor_id: Option<&str>, building_id: Option<&str>) -> NodeScope {
    match (floor_id, building_id) {
        (Some(floor_id), _) => NodeScope::Floor { floor_id: floor_id.to_string() },
        (None, Some(building_id)) => NodeScope::Building { building_id: building_id.to_string() },
        (None, None) => NodeScope::Any,
    }
}

/// Find a path between two node keys with the default policy.
pub fn find_path(
    graph: &NavigationGraph,
    from: &str,
    to: &str,
    options: &PathOptions,
) -> Result<PathResult, PathError> {
    Pathfinder::new(graph).find_path(from, to, options)
}

/// Find a path between two positions with the default policy.
pub fn find_path_from_positions(
    graph: &NavigationGraph,
    from: Position,
    to: Position,
    context: &NavigationContext,
    options: &PathOptions,
) -> Result<PathResult, PathError> {
    Pathfinder::new(graph).find_path_from_positions(from, to, context, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GraphEdge, NodeKind};

    fn line_graph() -> (NavigationGraph, Vec<NodeId>) {
        // a ── b ── c, plus d isolated
        let mut graph = NavigationGraph::new();
        let ids: Vec<NodeId> = [("a", 0.0), ("b", 0.001), ("c", 0.002), ("d", 0.01)]
            .iter()
            .map(|(key, lat)| {
                graph.insert_node(key.to_string(), key.to_uppercase(), Position::new(*lat, 0.0), None, None, NodeKind::Intersection)
            })
            .collect();
        for pair in ids[..3].windows(2) {
            let d = graph.node(pair[0]).unwrap().position.distance_to(&graph.node(pair[1]).unwrap().position);
            graph.insert_bidirectional(GraphEdge::new(pair[0], pair[1], d), false);
        }
        (graph, ids)
    }

    #[test]
    fn test_find_path_simple() {
        let (graph, ids) = line_graph();
        let result = find_path(&graph, "a", "c", &PathOptions::default()).unwrap();
        assert_eq!(result.nodes, vec![ids[0], ids[1], ids[2]]);
        assert_eq!(result.hop_count(), 2);
        assert!((result.total_distance - 222.639).abs() < 0.01);
        assert_eq!(result.waypoints.len(), 3);
        assert_eq!(result.instructions.last().unwrap().text, "Arrive at C");
    }

    #[test]
    fn test_unknown_node() {
        let (graph, _) = line_graph();
        let err = find_path(&graph, "a", "zzz", &PathOptions::default()).unwrap_err();
        assert_eq!(err, PathError::NodeNotFound("zzz".into()));
    }

    #[test]
    fn test_disconnected_goal() {
        let (graph, _) = line_graph();
        let err = find_path(&graph, "a", "d", &PathOptions::default()).unwrap_err();
        assert!(matches!(err, PathError::NoPathFound { .. }));
    }

    #[test]
    fn test_start_equals_goal() {
        let (graph, ids) = line_graph();
        let result = find_path(&graph, "b", "b", &PathOptions::default()).unwrap();
        assert_eq!(result.nodes, vec![ids[1]]);
        assert_eq!(result.total_distance, 0.0);
        assert_eq!(result.waypoints.len(), 1);
    }

    #[test]
    fn test_excluded_nodes_are_pruned() {
        let (graph, ids) = line_graph();
        let options = PathOptions::default().excluding([ids[1]]);
        assert!(find_path(&graph, "a", "c", &options).is_err());
        // Excluding the goal itself has no effect.
        let options = PathOptions::default().excluding([ids[2]]);
        assert!(find_path(&graph, "a", "c", &options).is_ok());
    }

    #[test]
    fn test_position_endpoints_add_offset() {
        let (graph, _) = line_graph();
        let from = Position::new(0.0, 0.0001);
        let to = Position::new(0.002, 0.0001);
        let result = find_path_from_positions(&graph, from, to, &NavigationContext::outdoor(), &PathOptions::default()).unwrap();
        let offset = 2.0 * Position::new(0.0, 0.0).distance_to(&from);
        assert!((result.total_distance - (222.639 + offset)).abs() < 0.05);
        assert_eq!(result.waypoints.first(), Some(&from));
        assert_eq!(result.waypoints.last(), Some(&to));
    }

    #[test]
    fn test_position_with_empty_scope() {
        let (graph, _) = line_graph();
        let context = NavigationContext::floors(Some("nowhere"), None);
        let err = find_path_from_positions(&graph, Position::default(), Position::default(), &context, &PathOptions::default())
            .unwrap_err();
        assert!(matches!(err, PathError::NoNearbyNode { .. }));
    }

    fn lift_and_stairs() -> NavigationGraph {
        // Lower floor hub h0 joined to upper hub h1 by a lift (4.0) and stairs (8.0).
        let mut graph = NavigationGraph::new();
        let mut add = |key: &str, lat: f64, floor: &str| {
            graph.insert_node(key.into(), key.into(), Position::new(lat, 0.0), Some(floor.into()), Some("b".into()), NodeKind::Landmark)
        };
        let h0 = add("h0", 0.0, "f0");
        let el0 = add("el0", 0.0001, "f0");
        let st0 = add("st0", -0.0001, "f0");
        let h1 = add("h1", 0.0, "f1");
        let el1 = add("el1", 0.0001, "f1");
        let st1 = add("st1", -0.0001, "f1");
        for (a, b) in [(h0, el0), (h0, st0), (h1, el1), (h1, st1)] {
            graph.insert_bidirectional(GraphEdge::new(a, b, 11.1), false);
        }
        for (a, b, w, t) in [(el0, el1, 4.0, TransitionType::Elevator), (st0, st1, 8.0, TransitionType::Stairs)] {
            let mut edge = GraphEdge::new(a, b, w);
            edge.is_vertical_transition = true;
            edge.transition_type = Some(t);
            graph.insert_bidirectional(edge, false);
        }
        graph
    }

    #[test]
    fn test_elevator_preference_weighting() {
        let graph = lift_and_stairs();
        let preferred = find_path(&graph, "h0", "h1", &PathOptions::prefer_elevator(true)).unwrap();
        assert_eq!(preferred.floor_transitions[0].transition_type, TransitionType::Elevator);
        assert!((preferred.total_cost - (22.2 + 4.0)).abs() < 1e-9);

        let plain = find_path(&graph, "h0", "h1", &PathOptions::prefer_elevator(false)).unwrap();
        // 4.0 × 1.2 still beats stairs at 8.0.
        assert!((plain.total_cost - (22.2 + 4.8)).abs() < 1e-9);
        assert_eq!(plain.total_distance, preferred.total_distance);
    }

    #[test]
    fn test_path_along_follows_given_nodes() {
        let graph = lift_and_stairs();
        let id = |key: &str| graph.node_id(key).unwrap();
        let pathfinder = Pathfinder::new(&graph);

        let stairs = pathfinder.path_along(&[id("st0"), id("st1")], &PathOptions::prefer_elevator(true)).unwrap();
        assert_eq!(stairs.total_distance, 8.0);
        assert_eq!(stairs.total_cost, 12.0);
        assert_eq!(stairs.floor_transitions.len(), 1);

        let err = pathfinder.path_along(&[id("st0"), id("el1")], &PathOptions::default()).unwrap_err();
        assert!(matches!(err, PathError::NoPathFound { .. }));
    }

    #[test]
    fn test_avoid_stairs() {
        let options = PathOptions { avoid_stairs: true, ..PathOptions::default() };
        // Detours through the lift.
        let detour = find_path(&lift_and_stairs(), "st0", "st1", &options).unwrap();
        assert_eq!(detour.floor_transitions[0].transition_type, TransitionType::Elevator);

        // Stairs as the only connection.
        let mut graph = NavigationGraph::new();
        let a = graph.insert_node("a".into(), "A".into(), Position::default(), Some("f0".into()), None, NodeKind::Landmark);
        let b = graph.insert_node("b".into(), "B".into(), Position::default(), Some("f1".into()), None, NodeKind::Landmark);
        let mut edge = GraphEdge::new(a, b, 8.0);
        edge.is_vertical_transition = true;
        edge.transition_type = Some(TransitionType::Stairs);
        graph.insert_bidirectional(edge, false);
        assert!(find_path(&graph, "a", "b", &options).is_err());
    }
}
