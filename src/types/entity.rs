//! Road-system entity model.
//!
//! This is the read-only input to the kernel: buildings with floors, outdoor
//! roads, landmarks, and intersections. It is produced by an external
//! persistence/import layer and never mutated here.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::geo::{polyline_length, Position};
use crate::canonical::canonical_hash_hex;

/// Kind of walkable road segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadType {
    /// Outdoor footpath.
    Footpath,
    /// Sidewalk alongside a street.
    Sidewalk,
    /// Street shared with vehicles.
    Street,
    /// Marked crossing.
    Crosswalk,
    /// Indoor corridor.
    Corridor,
    /// Ramp (step-free slope).
    Ramp,
    /// Default/unspecified.
    Other,
}

impl Default for RoadType {
    fn default() -> Self {
        Self::Other
    }
}

impl fmt::Display for RoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Footpath => write!(f, "footpath"),
            Self::Sidewalk => write!(f, "sidewalk"),
            Self::Street => write!(f, "street"),
            Self::Crosswalk => write!(f, "crosswalk"),
            Self::Corridor => write!(f, "corridor"),
            Self::Ramp => write!(f, "ramp"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Kind of point of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkType {
    /// Building entrance.
    Entrance,
    /// Building exit.
    Exit,
    /// Elevator car stop.
    Elevator,
    /// Stairwell landing.
    Stairs,
    /// Escalator landing.
    Escalator,
    /// Ramp landing between floors.
    Ramp,
    /// Office.
    Office,
    /// Classroom or lecture hall.
    Classroom,
    /// Restroom.
    Restroom,
    /// Anything else.
    Other,
}

impl LandmarkType {
    /// Whether landmarks of this type let people in or out of a building.
    pub fn is_entrance_or_exit(&self) -> bool {
        matches!(self, Self::Entrance | Self::Exit)
    }
}

impl Default for LandmarkType {
    fn default() -> Self {
        Self::Other
    }
}

impl fmt::Display for LandmarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Entrance => "entrance",
            Self::Exit => "exit",
            Self::Elevator => "elevator",
            Self::Stairs => "stairs",
            Self::Escalator => "escalator",
            Self::Ramp => "ramp",
            Self::Office => "office",
            Self::Classroom => "classroom",
            Self::Restroom => "restroom",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// A walkable road segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Road {
    /// Globally unique ID.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Ordered polyline.
    pub points: Vec<Position>,
    /// Road kind.
    #[serde(default)]
    pub road_type: RoadType,
    /// Width in meters.
    #[serde(default)]
    pub width: f64,
    /// Traversable only from first to last point.
    #[serde(default)]
    pub is_one_way: bool,
    /// Intersections along the road, in travel order.
    #[serde(default)]
    pub connected_intersections: Vec<String>,
}

impl Road {
    /// Length of the raw polyline in meters.
    pub fn length(&self) -> f64 {
        polyline_length(&self.points)
    }

    /// Whether the road joins at least two intersections.
    pub fn is_connected(&self) -> bool {
        self.connected_intersections.len() >= 2
    }
}

/// A point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Globally unique ID.
    pub id: String,
    /// Display name. Shared by all floors of one elevator/stairwell.
    pub name: String,
    /// Landmark kind.
    pub landmark_type: LandmarkType,
    /// Location.
    pub position: Position,
    /// Step-free access.
    #[serde(default)]
    pub is_accessible: bool,
    /// Part of an elevator/stairwell/escalator spanning floors.
    #[serde(default)]
    pub is_vertical_circulation: bool,
    /// Floors reachable through this landmark.
    #[serde(default)]
    pub connected_floors: Vec<String>,
}

impl Landmark {
    /// Whether this landmark can carry people to `floor_id`.
    pub fn connects_to(&self, floor_id: &str) -> bool {
        self.is_vertical_circulation && self.connected_floors.iter().any(|f| f == floor_id)
    }
}

/// A named junction in a road network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intersection {
    /// Globally unique ID.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Location.
    pub position: Position,
    /// Roads meeting here.
    #[serde(default)]
    pub connected_road_ids: Vec<String>,
}

/// One floor of a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    /// Globally unique ID.
    pub id: String,
    /// Display name ("Ground Floor").
    pub name: String,
    /// Level number, 0 is ground.
    pub level: i32,
    /// Owning building (back-reference).
    pub building_id: String,
    /// Corridors on this floor.
    #[serde(default)]
    pub roads: Vec<Road>,
    /// Points of interest on this floor.
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
    /// Corridor junctions on this floor.
    #[serde(default)]
    pub intersections: Vec<Intersection>,
}

impl Floor {
    /// Entrance and exit landmarks on this floor.
    pub fn entrances(&self) -> impl Iterator<Item = &Landmark> {
        self.landmarks.iter().filter(|l| l.landmark_type.is_entrance_or_exit())
    }

    /// Vertical-circulation landmarks on this floor.
    pub fn vertical_circulation(&self) -> impl Iterator<Item = &Landmark> {
        self.landmarks.iter().filter(|l| l.is_vertical_circulation)
    }
}

/// A building with one or more floors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Globally unique ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Footprint center.
    pub center: Position,
    /// Floor level shown by default.
    #[serde(default)]
    pub default_floor_level: i32,
    /// Floors, level-unique.
    #[serde(default)]
    pub floors: Vec<Floor>,
}

impl Building {
    /// Find a floor by ID.
    pub fn floor(&self, floor_id: &str) -> Option<&Floor> {
        self.floors.iter().find(|f| f.id == floor_id)
    }

    /// Find a floor by level.
    pub fn floor_at_level(&self, level: i32) -> Option<&Floor> {
        self.floors.iter().find(|f| f.level == level)
    }

    /// The floor people enter on: level 0, else the default level.
    pub fn ground_floor(&self) -> Option<&Floor> {
        self.floor_at_level(0)
            .or_else(|| self.floor_at_level(self.default_floor_level))
    }
}

/// Root aggregate of the road-system entity model.
///
/// All IDs across the aggregate are expected to be globally unique; the
/// validator reports violations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoadSystem {
    /// Buildings.
    #[serde(default)]
    pub buildings: Vec<Building>,
    /// Outdoor roads.
    #[serde(default)]
    pub outdoor_roads: Vec<Road>,
    /// Outdoor landmarks.
    #[serde(default)]
    pub outdoor_landmarks: Vec<Landmark>,
    /// Outdoor intersections.
    #[serde(default)]
    pub outdoor_intersections: Vec<Intersection>,
}

impl RoadSystem {
    /// Create an empty road system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a road system from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deterministic content fingerprint (xxh64 hex of canonical JSON).
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(self)
    }

    /// Whether the system has no buildings, roads, or intersections.
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
            && self.outdoor_roads.is_empty()
            && self.outdoor_intersections.is_empty()
    }

    /// Find a building by ID.
    pub fn building(&self, building_id: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == building_id)
    }

    /// Find a floor and its building by floor ID.
    pub fn floor(&self, floor_id: &str) -> Option<(&Building, &Floor)> {
        self.buildings
            .iter()
            .find_map(|b| b.floor(floor_id).map(|f| (b, f)))
    }

    /// All roads, indoor and outdoor.
    pub fn all_roads(&self) -> impl Iterator<Item = &Road> {
        self.outdoor_roads.iter().chain(
            self.buildings
                .iter()
                .flat_map(|b| b.floors.iter().flat_map(|f| f.roads.iter())),
        )
    }

    /// All landmarks, indoor and outdoor.
    pub fn all_landmarks(&self) -> impl Iterator<Item = &Landmark> {
        self.outdoor_landmarks.iter().chain(
            self.buildings
                .iter()
                .flat_map(|b| b.floors.iter().flat_map(|f| f.landmarks.iter())),
        )
    }

    /// All intersections, indoor and outdoor.
    pub fn all_intersections(&self) -> impl Iterator<Item = &Intersection> {
        self.outdoor_intersections.iter().chain(
            self.buildings
                .iter()
                .flat_map(|b| b.floors.iter().flat_map(|f| f.intersections.iter())),
        )
    }

    /// Every entity ID in the aggregate, in traversal order (duplicates kept).
    pub fn all_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for building in &self.buildings {
            ids.push(&building.id);
            for floor in &building.floors {
                ids.push(&floor.id);
            }
        }
        ids.extend(self.all_roads().map(|r| r.id.as_str()));
        ids.extend(self.all_landmarks().map(|l| l.id.as_str()));
        ids.extend(self.all_intersections().map(|i| i.id.as_str()));
        ids
    }
}
