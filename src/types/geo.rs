//! Geographic primitives for the navigation graph.
//!
//! Positions are WGS84 latitude/longitude pairs in degrees. Distances are
//! great-circle (haversine) distances in meters on a sphere with the WGS84
//! equatorial radius, so 0.001° of latitude is ~111.32 m.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sphere radius used for all distance computations, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// A geographic position (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl Position {
    /// Create a new position.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance to another position, in meters.
    pub fn distance_to(&self, other: &Position) -> f64 {
        haversine_distance(self, other)
    }

    /// Initial bearing towards another position, in degrees `[0, 360)`.
    pub fn bearing_to(&self, other: &Position) -> f64 {
        initial_bearing(self, other)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Haversine distance between two positions, in meters.
pub fn haversine_distance(a: &Position, b: &Position) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from `a` to `b`, in degrees `[0, 360)`.
///
/// 0° is north, 90° is east.
pub fn initial_bearing(a: &Position, b: &Position) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    normalize_bearing(y.atan2(x).to_degrees())
}

/// Wrap an angle into `[0, 360)`.
pub fn normalize_bearing(degrees: f64) -> f64 {
    let wrapped = degrees % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Signed turn angle from `previous` to `current` bearing, in `[-180, 180)`.
///
/// Positive values are clockwise (right) turns.
pub fn turn_angle(previous: f64, current: f64) -> f64 {
    normalize_bearing(current - previous + 180.0) - 180.0
}

/// Eight-point compass name for a bearing.
pub fn cardinal_direction(bearing: f64) -> &'static str {
    const NAMES: [&str; 8] = [
        "north", "northeast", "east", "southeast",
        "south", "southwest", "west", "northwest",
    ];
    let sector = ((normalize_bearing(bearing) + 22.5) / 45.0).floor() as usize % 8;
    NAMES[sector]
}

/// Total length of a polyline, in meters.
pub fn polyline_length(points: &[Position]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_distance(&pair[0], &pair[1]))
        .sum()
}
