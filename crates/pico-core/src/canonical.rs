//! Canonical serialization and hashing.
//!
//! Every consensus object hashes to SHA3-256 over its canonical byte form:
//! compact JSON with no inter-token whitespace, fields in declaration order,
//! map keys in insertion order. Two peers MUST produce byte-identical output
//! for the same logical object or their hashes diverge and blocks are
//! rejected, so nothing here may depend on platform or locale.

use serde::Serialize;
use sha3::{Digest, Sha3_256};

use crate::types::Hash;

/// Canonical bytes of any serializable view.
///
/// Callers pass a *body* view (the object minus its `hash`, and minus `sign`
/// for signables), never the full wire object.
pub fn to_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("canonical serialization is infallible")
}

/// SHA3-256 of arbitrary bytes.
pub fn sha3_256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Canonical digest of a serializable view.
pub fn digest<T: Serialize>(value: &T) -> Hash {
    Hash::from_digest(sha3_256(&to_bytes(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Probe {
        b: u32,
        a: u32,
    }

    #[test]
    fn compact_and_declaration_ordered() {
        let bytes = to_bytes(&Probe { b: 2, a: 1 });
        assert_eq!(bytes, br#"{"b":2,"a":1}"#);
    }

    #[test]
    fn insertion_order_preserved_for_maps() {
        let mut map = indexmap::IndexMap::new();
        map.insert("z".to_string(), 1u32);
        map.insert("a".to_string(), 2u32);
        assert_eq!(to_bytes(&map), br#"{"z":1,"a":2}"#);
    }

    #[test]
    fn whole_floats_keep_trailing_zero() {
        #[derive(Serialize)]
        struct F {
            rew: f64,
        }
        assert_eq!(to_bytes(&F { rew: 256.0 }), br#"{"rew":256.0}"#);
    }

    #[test]
    fn digest_is_stable() {
        let a = digest(&Probe { b: 7, a: 9 });
        let b = digest(&Probe { b: 7, a: 9 });
        assert_eq!(a, b);
        assert_ne!(a, digest(&Probe { b: 9, a: 7 }));
    }
}
