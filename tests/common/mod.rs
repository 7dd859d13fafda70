//! Shared road-system fixtures for integration tests.

#![allow(dead_code)]

use wayfinding_kernel::{
    Building, Floor, Intersection, Landmark, LandmarkType, Position, Road, RoadSystem, RoadType,
};

/// ~11 m of latitude or longitude at the equator.
pub const STEP: f64 = 0.0001;

pub fn intersection(id: &str, lat: f64, lon: f64, roads: &[&str]) -> Intersection {
    Intersection {
        id: id.into(),
        name: id.to_uppercase(),
        position: Position::new(lat, lon),
        connected_road_ids: roads.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn road(id: &str, from: &Intersection, to: &Intersection, road_type: RoadType, one_way: bool) -> Road {
    Road {
        id: id.into(),
        name: format!("{} road", id),
        points: vec![from.position, to.position],
        road_type,
        width: 3.0,
        is_one_way: one_way,
        connected_intersections: vec![from.id.clone(), to.id.clone()],
    }
}

pub fn landmark(id: &str, name: &str, kind: LandmarkType, lat: f64, lon: f64, floors: &[&str]) -> Landmark {
    Landmark {
        id: id.into(),
        name: name.into(),
        landmark_type: kind,
        position: Position::new(lat, lon),
        is_accessible: true,
        is_vertical_circulation: matches!(
            kind,
            LandmarkType::Elevator | LandmarkType::Stairs | LandmarkType::Escalator
        ),
        connected_floors: floors.iter().map(|s| s.to_string()).collect(),
    }
}

/// Two intersections, A at (0, 0) and B at (0.001°, 0), joined by one road.
pub fn single_road(one_way: bool) -> RoadSystem {
    let a = intersection("A", 0.0, 0.0, &["AB"]);
    let b = intersection("B", 0.001, 0.0, &["AB"]);
    RoadSystem {
        outdoor_roads: vec![road("AB", &a, &b, RoadType::Footpath, one_way)],
        outdoor_intersections: vec![a, b],
        ..Default::default()
    }
}

/// A floor with one east-west corridor of three steps starting at `lon`.
pub fn corridor_floor(building_id: &str, floor_id: &str, name: &str, level: i32, lon: f64, landmarks: Vec<Landmark>) -> Floor {
    let road_id = format!("{}-corridor", floor_id);
    let west = intersection(&format!("{}-w", floor_id), 0.0, lon, &[road_id.as_str()]);
    let east = intersection(&format!("{}-e", floor_id), 0.0, lon + 3.0 * STEP, &[road_id.as_str()]);
    Floor {
        id: floor_id.into(),
        name: name.into(),
        level,
        building_id: building_id.into(),
        roads: vec![road(&road_id, &west, &east, RoadType::Corridor, false)],
        landmarks,
        intersections: vec![west, east],
    }
}

/// Two-floor building at `lon`.
///
/// Ground: entrance south of the west end, a lift and a stair north of the
/// corridor. First: the matching lift and stair, and an office.
pub fn building(id: &str, name: &str, lon: f64, with_stairs: bool) -> Building {
    let f0 = format!("{}-f0", id);
    let f1 = format!("{}-f1", id);
    let floors = [f0.as_str(), f1.as_str()];

    let mut ground = vec![
        landmark(&format!("{}-door", id), "Main Door", LandmarkType::Entrance, -STEP, lon, &[]),
        landmark(&format!("{}-el0", id), "Lift", LandmarkType::Elevator, STEP, lon + STEP, &floors),
    ];
    let mut first = vec![
        landmark(&format!("{}-el1", id), "Lift", LandmarkType::Elevator, STEP, lon + STEP, &floors),
        landmark(&format!("{}-office", id), "Office", LandmarkType::Office, -STEP, lon + 3.0 * STEP, &[]),
    ];
    if with_stairs {
        ground.push(landmark(&format!("{}-st0", id), "Stair", LandmarkType::Stairs, STEP, lon + 2.0 * STEP, &floors));
        first.push(landmark(&format!("{}-st1", id), "Stair", LandmarkType::Stairs, STEP, lon + 2.0 * STEP, &floors));
    }

    Building {
        id: id.into(),
        name: name.into(),
        center: Position::new(0.0, lon + STEP),
        default_floor_level: 0,
        floors: vec![
            corridor_floor(id, &f0, "Ground", 0, lon, ground),
            corridor_floor(id, &f1, "First", 1, lon, first),
        ],
    }
}

/// One building with entrance, lift and office; nothing outdoors.
pub fn hall() -> RoadSystem {
    RoadSystem {
        buildings: vec![building("hall", "Hall", 0.0, false)],
        ..Default::default()
    }
}

/// Library at lon 0 and Lab at lon 0.01, joined by an outdoor walk south of
/// both entrances.
pub fn campus() -> RoadSystem {
    let west = intersection("quad-w", -3.0 * STEP, 0.0, &["quad"]);
    let east = intersection("quad-e", -3.0 * STEP, 0.01, &["quad"]);
    RoadSystem {
        buildings: vec![
            building("lib", "Library", 0.0, true),
            building("lab", "Lab", 0.01, true),
        ],
        outdoor_roads: vec![road("quad", &west, &east, RoadType::Footpath, false)],
        outdoor_intersections: vec![west, east],
        ..Default::default()
    }
}
