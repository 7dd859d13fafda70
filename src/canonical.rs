//! Canonical serialization for deterministic fingerprints.
//!
//! Road systems, graphs, and policies are fingerprinted by hashing their
//! canonical JSON form with xxh64.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Vectors serialize in index order
//! - No HashMap allowed: Use BTreeMap for maps in hashed data
//! - Floats that feed a fingerprint are quantized first where equality matters

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Only used with in-crate types whose serialization cannot fail.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    #[test]
    fn test_determinism() {
        let p = Position::new(51.5, -0.12);

        let h1 = canonical_hash(&p);
        let h2 = canonical_hash(&p);
        assert_eq!(h1, h2);
        assert_eq!(canonical_hash_hex(&p).len(), 16);
    }

    #[test]
    fn test_field_change_changes_hash() {
        let a = Position::new(51.5, -0.12);
        let b = Position::new(51.5, -0.13);
        assert_ne!(canonical_hash(&a), canonical_hash(&b));
    }
}
