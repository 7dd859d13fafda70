//! Turn-by-turn instruction generation for a traversed edge sequence.
//!
//! ## Turn classification
//!
//! The bearing of each horizontal edge is compared to the previous one:
//!
//! | \|Δ\| | Maneuver |
//! |-----|----------|
//! | < 30° | straight, merged into the current instruction |
//! | 30°–120° | left / right |
//! | > 120° | sharp left / sharp right |
//!
//! Vertical-transition edges always get their own instruction naming the
//! transition type and both floors.

use crate::policy::RoutingPolicyV1;
use crate::types::geo::{cardinal_direction, turn_angle};
use crate::types::route::format_distance;
use crate::types::{
    EdgeId, FloorTransition, GraphEdge, Maneuver, NavigationGraph, NodeId, Position,
    RouteInstruction, TransitionType,
};

/// Edges shorter than this have no meaningful bearing.
const MIN_BEARING_LENGTH_M: f64 = 0.01;

/// An instruction whose trailing distance is still accumulating.
struct Pending {
    maneuver: Maneuver,
    heading: &'static str,
    position: Position,
    distance: f64,
}

impl Pending {
    fn finish(self) -> RouteInstruction {
        let lead = match self.maneuver {
            Maneuver::Depart => format!("Head {}", self.heading),
            Maneuver::TurnLeft => "Turn left".to_string(),
            Maneuver::TurnRight => "Turn right".to_string(),
            Maneuver::SharpLeft => "Make a sharp left".to_string(),
            Maneuver::SharpRight => "Make a sharp right".to_string(),
            other => other.to_string(),
        };
        RouteInstruction {
            maneuver: self.maneuver,
            text: format!("{} and continue for {}", lead, format_distance(self.distance)),
            distance_m: self.distance,
            position: self.position,
        }
    }
}

/// Classify a signed turn angle (positive = right).
pub fn classify_turn(angle: f64, policy: &RoutingPolicyV1) -> Option<Maneuver> {
    let magnitude = angle.abs();
    if magnitude < policy.straight_threshold_deg {
        None
    } else if magnitude <= policy.sharp_turn_threshold_deg {
        Some(if angle > 0.0 { Maneuver::TurnRight } else { Maneuver::TurnLeft })
    } else {
        Some(if angle > 0.0 { Maneuver::SharpRight } else { Maneuver::SharpLeft })
    }
}

/// Generate instructions for a path.
///
/// `nodes` and `edges` must describe the same path (`edges.len() + 1 ==
/// nodes.len()`); handles missing from the graph are skipped.
pub fn generate_instructions(
    graph: &NavigationGraph,
    nodes: &[NodeId],
    edges: &[EdgeId],
    policy: &RoutingPolicyV1,
) -> Vec<RouteInstruction> {
    let mut out = Vec::new();
    let mut pending: Option<Pending> = None;
    let mut last_bearing: Option<f64> = None;

    for edge in edges.iter().filter_map(|id| graph.edge(*id)) {
        let (Some(from), Some(to)) = (graph.node(edge.from), graph.node(edge.to)) else {
            continue;
        };

        if edge.is_vertical_transition {
            out.extend(pending.take().map(Pending::finish));
            out.push(vertical_instruction(graph, edge));
            last_bearing = None;
            continue;
        }

        let length = from.position.distance_to(&to.position);
        if length < MIN_BEARING_LENGTH_M {
            if let Some(current) = pending.as_mut() {
                current.distance += edge.weight;
            }
            continue;
        }
        let bearing = from.position.bearing_to(&to.position);

        let maneuver = match last_bearing {
            None => Some(Maneuver::Depart),
            Some(previous) => classify_turn(turn_angle(previous, bearing), policy),
        };
        match (maneuver, pending.as_mut()) {
            (None, Some(current)) => current.distance += edge.weight,
            (maneuver, _) => {
                out.extend(pending.take().map(Pending::finish));
                pending = Some(Pending {
                    maneuver: maneuver.unwrap_or(Maneuver::Depart),
                    heading: cardinal_direction(bearing),
                    position: from.position,
                    distance: edge.weight,
                });
            }
        }
        last_bearing = Some(bearing);
    }
    out.extend(pending.take().map(Pending::finish));

    if let Some(goal) = nodes.last().and_then(|id| graph.node(*id)) {
        out.push(RouteInstruction::announcement(
            Maneuver::Arrive,
            format!("Arrive at {}", goal.name),
            goal.position,
        ));
    }
    out
}

fn floor_label(graph: &NavigationGraph, floor_id: Option<&str>) -> (String, Option<i32>) {
    match floor_id.and_then(|id| graph.floor_info(id)) {
        Some(info) => (format!("{} (level {})", info.name, info.level), Some(info.level)),
        None => (floor_id.unwrap_or("outdoors").to_string(), None),
    }
}

fn vertical_instruction(graph: &NavigationGraph, edge: &GraphEdge) -> RouteInstruction {
    let transition = edge.transition_type.unwrap_or(TransitionType::Other);
    let from = graph.node(edge.from);
    let to = graph.node(edge.to);
    let (from_label, from_level) = floor_label(graph, from.and_then(|n| n.floor_id.as_deref()));
    let (to_label, to_level) = floor_label(graph, to.and_then(|n| n.floor_id.as_deref()));
    let direction = match (from_level, to_level) {
        (Some(a), Some(b)) if b > a => " up",
        (Some(a), Some(b)) if b < a => " down",
        _ => "",
    };
    RouteInstruction::announcement(
        Maneuver::ChangeFloor(transition),
        format!("Take the {}{} from {} to {}", transition, direction, from_label, to_label),
        from.map(|n| n.position).unwrap_or_default(),
    )
}

/// Floor transitions used by an edge sequence, in order.
pub fn floor_transitions(graph: &NavigationGraph, edges: &[EdgeId]) -> Vec<FloorTransition> {
    edges
        .iter()
        .filter_map(|id| graph.edge(*id))
        .filter(|edge| edge.is_vertical_transition)
        .filter_map(|edge| {
            let from = graph.node(edge.from)?;
            let to = graph.node(edge.to)?;
            Some(FloorTransition {
                from_floor_id: from.floor_id.clone()?,
                to_floor_id: to.floor_id.clone()?,
                transition_type: edge.transition_type.unwrap_or(TransitionType::Other),
                position: from.position,
                landmark_id: from.key.clone(),
                weight: edge.weight,
            })
        })
        .collect()
}
