//! Navigation context classifier.
//!
//! Decides the shape of a route from the optional floor and building of its
//! two endpoints. Classification is total: every context maps to exactly one
//! [`RouteKind`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::RoadSystem;

/// The six mutually exclusive route shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// Both endpoints outdoors.
    OutdoorOnly,
    /// Both endpoints on the same floor.
    SameFloor,
    /// Different floors of one building.
    SameBuilding,
    /// Endpoints in two different buildings.
    DifferentBuildings,
    /// From inside a building to outdoors.
    IndoorToOutdoor,
    /// From outdoors into a building.
    OutdoorToIndoor,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutdoorOnly => write!(f, "outdoor_only"),
            Self::SameFloor => write!(f, "same_floor"),
            Self::SameBuilding => write!(f, "same_building"),
            Self::DifferentBuildings => write!(f, "different_buildings"),
            Self::IndoorToOutdoor => write!(f, "indoor_to_outdoor"),
            Self::OutdoorToIndoor => write!(f, "outdoor_to_indoor"),
        }
    }
}

/// Where a route starts and ends, as far as floors and buildings go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationContext {
    /// Floor of the start, absent outdoors.
    #[serde(default)]
    pub start_floor_id: Option<String>,
    /// Floor of the end, absent outdoors.
    #[serde(default)]
    pub end_floor_id: Option<String>,
    /// Building of the start.
    #[serde(default)]
    pub start_building_id: Option<String>,
    /// Building of the end.
    #[serde(default)]
    pub end_building_id: Option<String>,
}

impl NavigationContext {
    /// Context with both endpoints outdoors.
    pub fn outdoor() -> Self {
        Self::default()
    }

    /// Context from two optional floor IDs; buildings are filled in by
    /// [`NavigationContext::resolve`].
    pub fn floors(start_floor_id: Option<&str>, end_floor_id: Option<&str>) -> Self {
        Self {
            start_floor_id: start_floor_id.map(str::to_string),
            end_floor_id: end_floor_id.map(str::to_string),
            ..Self::default()
        }
    }

    /// Normalize against a road system.
    ///
    /// A floor ID the system does not know is dropped, so that endpoint is
    /// treated as outdoors. A known floor always carries its own building,
    /// overriding whatever building the caller passed.
    pub fn resolve(&self, system: &RoadSystem) -> Self {
        let side = |floor_id: &Option<String>| {
            floor_id
                .as_deref()
                .and_then(|id| system.floor(id))
                .map(|(building, floor)| (floor.id.clone(), building.id.clone()))
                .unzip()
        };
        let (start_floor_id, start_building_id) = side(&self.start_floor_id);
        let (end_floor_id, end_building_id) = side(&self.end_floor_id);
        Self {
            start_floor_id,
            end_floor_id,
            start_building_id,
            end_building_id,
        }
    }

    /// Classify this context.
    pub fn kind(&self) -> RouteKind {
        classify_route(self)
    }
}

/// Classify a navigation context into a route kind.
pub fn classify_route(context: &NavigationContext) -> RouteKind {
    match (&context.start_floor_id, &context.end_floor_id) {
        (None, None) => RouteKind::OutdoorOnly,
        (Some(_), None) => RouteKind::IndoorToOutdoor,
        (None, Some(_)) => RouteKind::OutdoorToIndoor,
        (Some(start), Some(end)) if start == end => RouteKind::SameFloor,
        (Some(_), Some(_)) if context.start_building_id == context.end_building_id => {
            RouteKind::SameBuilding
        }
        (Some(_), Some(_)) => RouteKind::DifferentBuildings,
    }
}
