//! Routing policy definitions.

pub mod v1;
pub mod scoring;

pub use v1::{RoutingPolicyV1, TransitionPenalties};
pub use scoring::{adjusted_weight, SearchCandidate};
