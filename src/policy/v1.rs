//! RoutingPolicy v1: every tunable constant of graph building and search.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! Floats are quantized to integers before hashing to avoid cross-platform
//! serialization differences. The quantization factor is 1e6 (multiply by
//! 1,000,000 and round to i64).
//!
//! The values here are heuristics, not physical measurements. Floor height
//! and the stairs penalty in particular are meant to be tuned per campus.

use serde::{Deserialize, Serialize};
use crate::canonical::canonical_hash_hex;
use crate::types::TransitionType;
use crate::DEFAULT_POLICY_VERSION;

/// Quantization factor for float normalization.
const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Quantize a float to an i64 for deterministic hashing.
pub fn quantize(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

/// Cost multipliers per vertical transition type.
///
/// Applied at build time on top of `|Δlevel| × floor_height_m`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionPenalties {
    /// Elevator multiplier.
    pub elevator: f64,
    /// Stairs multiplier.
    pub stairs: f64,
    /// Escalator multiplier.
    pub escalator: f64,
    /// Ramp multiplier.
    pub ramp: f64,
    /// Multiplier for unrecognised circulation types.
    pub other: f64,
}

impl TransitionPenalties {
    /// Get the multiplier for a transition type.
    pub fn get(&self, transition: TransitionType) -> f64 {
        match transition {
            TransitionType::Elevator => self.elevator,
            TransitionType::Stairs => self.stairs,
            TransitionType::Escalator => self.escalator,
            TransitionType::Ramp => self.ramp,
            TransitionType::Other => self.other,
        }
    }

    fn to_quantized(&self) -> [i64; 5] {
        [
            quantize(self.elevator),
            quantize(self.stairs),
            quantize(self.escalator),
            quantize(self.ramp),
            quantize(self.other),
        ]
    }
}

impl Default for TransitionPenalties {
    fn default() -> Self {
        Self {
            elevator: 1.0,
            stairs: 2.0,
            escalator: 1.0,
            ramp: 1.0,
            other: 1.0,
        }
    }
}

/// Quantized policy parameters for deterministic hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct QuantizedPolicyParams {
    version: String,
    floor_height_m: i64,
    transition_penalties: [i64; 5],
    prefer_elevator_multiplier: i64,
    avoid_elevator_multiplier: i64,
    landmark_link_radius_m: i64,
    max_landmark_links: usize,
    waypoint_tolerance_m: i64,
    straight_threshold_deg: i64,
    sharp_turn_threshold_deg: i64,
    correspondence_tolerance_m: i64,
    walking_speed_mps: i64,
    floor_change_secs: i64,
    large_network_node_threshold: usize,
}

/// Routing policy version 1.
///
/// ## Parameters
///
/// - `floor_height_m`: assumed floor-to-floor height for vertical edges
/// - `transition_penalties`: build-time multiplier per transition type
/// - `prefer_elevator_multiplier`: search-time scale on non-elevator transitions
///   when the caller prefers elevators
/// - `avoid_elevator_multiplier`: search-time scale on elevator transitions
///   when the caller does not prefer elevators
/// - `landmark_link_radius_m` / `max_landmark_links`: how landmarks attach to
///   the walkable network
/// - `waypoint_tolerance_m`: snap distance between intersections and raw road points
/// - `straight_threshold_deg` / `sharp_turn_threshold_deg`: turn classification
/// - `correspondence_tolerance_m`: position fallback when matching a
///   circulation landmark across floors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingPolicyV1 {
    /// Policy version identifier.
    pub version: String,
    /// Floor-to-floor height in meters.
    pub floor_height_m: f64,
    /// Build-time transition multipliers.
    pub transition_penalties: TransitionPenalties,
    /// Non-elevator scale when elevators are preferred.
    pub prefer_elevator_multiplier: f64,
    /// Elevator scale when elevators are not preferred.
    pub avoid_elevator_multiplier: f64,
    /// Landmark-to-road link radius in meters.
    pub landmark_link_radius_m: f64,
    /// Maximum road links per landmark.
    pub max_landmark_links: usize,
    /// Road point inclusion tolerance in meters.
    pub waypoint_tolerance_m: f64,
    /// Below this angular change no turn is announced.
    pub straight_threshold_deg: f64,
    /// Above this angular change a turn is sharp.
    pub sharp_turn_threshold_deg: f64,
    /// Cross-floor landmark position tolerance in meters.
    pub correspondence_tolerance_m: f64,
    /// Walking speed used for duration estimates.
    pub walking_speed_mps: f64,
    /// Seconds added per floor change for duration estimates.
    pub floor_change_secs: f64,
    /// Node count above which the validator reports a performance note.
    pub large_network_node_threshold: usize,
}

impl RoutingPolicyV1 {
    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Weight of a vertical edge spanning `level_delta` floors.
    pub fn vertical_weight(&self, level_delta: i32, transition: TransitionType) -> f64 {
        f64::from(level_delta.unsigned_abs()) * self.floor_height_m * self.transition_penalties.get(transition)
    }

    /// Compute a hash of the policy parameters.
    ///
    /// Uses the quantized representation, so equal policies hash equally
    /// regardless of float formatting.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&self.to_quantized())
    }

    fn to_quantized(&self) -> QuantizedPolicyParams {
        QuantizedPolicyParams {
            version: self.version.clone(),
            floor_height_m: quantize(self.floor_height_m),
            transition_penalties: self.transition_penalties.to_quantized(),
            prefer_elevator_multiplier: quantize(self.prefer_elevator_multiplier),
            avoid_elevator_multiplier: quantize(self.avoid_elevator_multiplier),
            landmark_link_radius_m: quantize(self.landmark_link_radius_m),
            max_landmark_links: self.max_landmark_links,
            waypoint_tolerance_m: quantize(self.waypoint_tolerance_m),
            straight_threshold_deg: quantize(self.straight_threshold_deg),
            sharp_turn_threshold_deg: quantize(self.sharp_turn_threshold_deg),
            correspondence_tolerance_m: quantize(self.correspondence_tolerance_m),
            walking_speed_mps: quantize(self.walking_speed_mps),
            floor_change_secs: quantize(self.floor_change_secs),
            large_network_node_threshold: self.large_network_node_threshold,
        }
    }
}

impl Default for RoutingPolicyV1 {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            floor_height_m: 4.0,
            transition_penalties: TransitionPenalties::default(),
            prefer_elevator_multiplier: 1.5,
            avoid_elevator_multiplier: 1.2,
            landmark_link_radius_m: 50.0,
            max_landmark_links: 3,
            waypoint_tolerance_m: 5.0,
            straight_threshold_deg: 30.0,
            sharp_turn_threshold_deg: 120.0,
            correspondence_tolerance_m: 1.0,
            walking_speed_mps: 1.4,
            floor_change_secs: 15.0,
            large_network_node_threshold: 50_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertical_weight() {
        let policy = RoutingPolicyV1::default();
        assert_eq!(policy.vertical_weight(1, TransitionType::Elevator), 4.0);
        assert_eq!(policy.vertical_weight(-1, TransitionType::Stairs), 8.0);
        assert_eq!(policy.vertical_weight(3, TransitionType::Escalator), 12.0);
    }

    #[test]
    fn test_policy_params_hash_determinism() {
        let policy1 = RoutingPolicyV1::default();
        let policy2 = RoutingPolicyV1::default();

        assert_eq!(policy1.params_hash(), policy2.params_hash());
    }

    #[test]
    fn test_policy_params_hash_changes() {
        let policy1 = RoutingPolicyV1::default();
        let mut policy2 = RoutingPolicyV1::default();
        policy2.transition_penalties.stairs = 3.0;

        assert_ne!(policy1.params_hash(), policy2.params_hash());
    }

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(1.5), 1_500_000);
        assert_eq!(quantize(0.0000004), 0);
    }
}
