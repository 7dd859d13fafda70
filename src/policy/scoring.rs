//! Search-time cost adjustment and frontier ordering for A*.

use std::cmp::Ordering;

use super::v1::RoutingPolicyV1;
use crate::types::{GraphEdge, NodeId, TransitionType};

/// Effective cost of traversing `edge` under the caller's elevator preference.
///
/// Formula for vertical edges:
/// ```text
/// prefer_elevator && type != elevator  →  weight × prefer_elevator_multiplier (1.5)
/// !prefer_elevator && type == elevator →  weight × avoid_elevator_multiplier  (1.2)
/// otherwise                            →  weight
/// ```
/// Non-vertical edges are never scaled.
pub fn adjusted_weight(edge: &GraphEdge, prefer_elevator: bool, policy: &RoutingPolicyV1) -> f64 {
    if !edge.is_vertical_transition {
        return edge.weight;
    }
    let is_elevator = edge.transition_type == Some(TransitionType::Elevator);
    match (prefer_elevator, is_elevator) {
        (true, false) => edge.weight * policy.prefer_elevator_multiplier,
        (false, true) => edge.weight * policy.avoid_elevator_multiplier,
        _ => edge.weight,
    }
}

/// Frontier entry for the A* open set.
///
/// `BinaryHeap` is a max-heap, so the ordering is reversed: the candidate with
/// the lowest `f = g + h` compares greatest. Equal `f` values fall back to
/// insertion sequence (earlier first); this tie-break is an implementation
/// detail, not a guarantee callers should rely on.
#[derive(Debug, Clone, Copy)]
pub struct SearchCandidate {
    /// Node to expand.
    pub node: NodeId,
    /// Cost from the start.
    pub g: f64,
    /// `g` plus heuristic to the goal.
    pub f: f64,
    /// Insertion sequence number.
    pub seq: u64,
}

impl SearchCandidate {
    /// Create a new candidate.
    pub fn new(node: NodeId, g: f64, h: f64, seq: u64) -> Self {
        Self { node, g, f: g + h, seq }
    }
}

impl PartialEq for SearchCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchCandidate {}

impl PartialOrd for SearchCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Primary: lower f first
        // Secondary: earlier insertion first
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    fn vertical(transition: TransitionType, weight: f64) -> GraphEdge {
        let mut edge = GraphEdge::new(NodeId(0), NodeId(1), weight);
        edge.is_vertical_transition = true;
        edge.transition_type = Some(transition);
        edge
    }

    #[test]
    fn test_prefer_elevator_penalizes_stairs() {
        let policy = RoutingPolicyV1::default();
        let stairs = vertical(TransitionType::Stairs, 8.0);
        let elevator = vertical(TransitionType::Elevator, 4.0);

        assert_eq!(adjusted_weight(&stairs, true, &policy), 12.0);
        assert_eq!(adjusted_weight(&elevator, true, &policy), 4.0);
    }

    #[test]
    fn test_not_preferring_elevator_penalizes_elevator() {
        let policy = RoutingPolicyV1::default();
        let stairs = vertical(TransitionType::Stairs, 8.0);
        let elevator = vertical(TransitionType::Elevator, 4.0);

        assert_eq!(adjusted_weight(&stairs, false, &policy), 8.0);
        assert!((adjusted_weight(&elevator, false, &policy) - 4.8).abs() < 1e-12);
    }

    #[test]
    fn test_horizontal_edges_unscaled() {
        let policy = RoutingPolicyV1::default();
        let edge = GraphEdge::new(NodeId(0), NodeId(1), 25.0);
        assert_eq!(adjusted_weight(&edge, true, &policy), 25.0);
        assert_eq!(adjusted_weight(&edge, false, &policy), 25.0);
    }

    #[test]
    fn test_heap_pops_lowest_f_first() {
        let mut heap = BinaryHeap::new();
        heap.push(SearchCandidate::new(NodeId(1), 10.0, 5.0, 0));
        heap.push(SearchCandidate::new(NodeId(2), 1.0, 1.0, 1));
        heap.push(SearchCandidate::new(NodeId(3), 3.0, 0.0, 2));
        heap.push(SearchCandidate::new(NodeId(4), 2.0, 0.0, 3));

        let order: Vec<u32> = std::iter::from_fn(|| heap.pop()).map(|c| c.node.0).collect();
        assert_eq!(order, vec![2, 4, 3, 1]);
    }
}
