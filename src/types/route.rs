//! Route value types: path results, composed routes, instructions.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::geo::Position;
use super::graph::{EdgeId, NodeId, TransitionType};
use crate::context::RouteKind;

/// What the traveller does at an instruction point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "transition", rename_all = "snake_case")]
pub enum Maneuver {
    /// First movement of a path.
    Depart,
    /// Turn between 30° and 120° left.
    TurnLeft,
    /// Turn between 30° and 120° right.
    TurnRight,
    /// Turn sharper than 120° left.
    SharpLeft,
    /// Turn sharper than 120° right.
    SharpRight,
    /// Floor change.
    ChangeFloor(TransitionType),
    /// Leaving a building.
    ExitBuilding,
    /// Entering a building.
    EnterBuilding,
    /// Destination reached.
    Arrive,
}

impl Maneuver {
    /// Whether this maneuver is a horizontal turn.
    pub fn is_turn(&self) -> bool {
        matches!(self, Self::TurnLeft | Self::TurnRight | Self::SharpLeft | Self::SharpRight)
    }
}

impl fmt::Display for Maneuver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Depart => write!(f, "depart"),
            Self::TurnLeft => write!(f, "left"),
            Self::TurnRight => write!(f, "right"),
            Self::SharpLeft => write!(f, "sharp left"),
            Self::SharpRight => write!(f, "sharp right"),
            Self::ChangeFloor(t) => write!(f, "take {}", t),
            Self::ExitBuilding => write!(f, "exit"),
            Self::EnterBuilding => write!(f, "enter"),
            Self::Arrive => write!(f, "arrive"),
        }
    }
}

/// One human-readable navigation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInstruction {
    /// Maneuver performed at `position`.
    pub maneuver: Maneuver,
    /// Rendered text, e.g. "Turn left and continue for 40 m".
    pub text: String,
    /// Distance travelled after the maneuver until the next instruction, in meters.
    pub distance_m: f64,
    /// Where the maneuver happens.
    pub position: Position,
}

impl RouteInstruction {
    /// Create an instruction with fixed text and no trailing distance.
    pub fn announcement(maneuver: Maneuver, text: impl Into<String>, position: Position) -> Self {
        Self {
            maneuver,
            text: text.into(),
            distance_m: 0.0,
            position,
        }
    }
}

/// One use of a vertical-circulation edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorTransition {
    /// Floor left.
    pub from_floor_id: String,
    /// Floor arrived at.
    pub to_floor_id: String,
    /// Elevator, stairs, ...
    pub transition_type: TransitionType,
    /// Where the transition starts.
    pub position: Position,
    /// Landmark boarded.
    pub landmark_id: String,
    /// Edge weight of the transition.
    pub weight: f64,
}

/// Successful point-to-point search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    /// Visited nodes, start to goal.
    pub nodes: Vec<NodeId>,
    /// Traversed edges, one fewer than `nodes`.
    pub edges: Vec<EdgeId>,
    /// Continuous position sequence, start to end inclusive.
    pub waypoints: Vec<Position>,
    /// Sum of raw edge weights plus any snap offsets, in meters.
    pub total_distance: f64,
    /// Sum of preference-adjusted edge weights (what the search minimised).
    pub total_cost: f64,
    /// Turn-by-turn instructions.
    pub instructions: Vec<RouteInstruction>,
    /// Vertical transitions used.
    pub floor_transitions: Vec<FloorTransition>,
    /// Nodes popped from the frontier.
    pub nodes_expanded: usize,
}

impl PathResult {
    /// First node of the path.
    pub fn start(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// Last node of the path.
    pub fn goal(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Number of traversed edges.
    pub fn hop_count(&self) -> usize {
        self.edges.len()
    }
}

/// Kind of stage in a composed route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Walk inside a building.
    Indoor,
    /// Floor change.
    Vertical,
    /// Walk outside.
    Outdoor,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indoor => write!(f, "indoor"),
            Self::Vertical => write!(f, "vertical"),
            Self::Outdoor => write!(f, "outdoor"),
        }
    }
}

/// Summary of one composed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    /// Stage kind.
    pub stage: StageKind,
    /// Distance contributed.
    pub distance_m: f64,
    /// Floor the stage ends on, absent outdoors.
    pub floor_id: Option<String>,
    /// Number of waypoints contributed.
    pub waypoint_count: usize,
}

/// End-to-end route across floors and buildings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationRoute {
    /// Classified route shape.
    pub kind: RouteKind,
    /// Positions, start to end inclusive.
    pub waypoints: Vec<Position>,
    /// Sum of stage distances, in meters.
    pub total_distance: f64,
    /// Concatenated stage instructions plus building announcements.
    pub instructions: Vec<RouteInstruction>,
    /// Vertical transitions used, in order.
    pub floor_transitions: Vec<FloorTransition>,
    /// Per-stage breakdown.
    pub segments: Vec<RouteSegment>,
    /// Walking time estimate in seconds.
    pub estimated_duration_secs: f64,
}

impl NavigationRoute {
    /// Instruction texts in order.
    pub fn instruction_texts(&self) -> Vec<&str> {
        self.instructions.iter().map(|i| i.text.as_str()).collect()
    }
}

/// Format a distance for instruction text.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{:.0} m", meters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(12.4), "12 m");
        assert_eq!(format_distance(1520.0), "1.5 km");
    }

    #[test]
    fn test_maneuver_serialization() {
        let json = serde_json::to_string(&Maneuver::ChangeFloor(TransitionType::Elevator)).unwrap();
        assert_eq!(json, r#"{"type":"change_floor","transition":"elevator"}"#);
        let json = serde_json::to_string(&Maneuver::Depart).unwrap();
        assert_eq!(json, r#"{"type":"depart"}"#);
    }
}
