use std::collections::BTreeMap;

use indexmap::IndexMap;
use num_bigint::BigUint;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::types::PubKey;

/// Ordered round map: decimal round integer → (decimal prime → multiplicity).
///
/// The ordering is semantic: round `i` hashes the block with only rounds
/// `0..i` present, so this map MUST keep insertion order on every peer.
pub type WorkMap = IndexMap<String, IndexMap<String, u32>>;

// ── ProofOfWork ──────────────────────────────────────────────────────────────

/// The factorization puzzle embedded in a block.
///
/// Holds no back-reference to its block; every operation that needs the
/// block's serialization lives on [`crate::Block`] instead.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProofOfWork {
    /// Public key credited with the work (and with the next block's Reward).
    pub solver: PubKey,

    pub work: WorkMap,
}

impl ProofOfWork {
    pub fn new(solver: PubKey) -> Self {
        Self {
            solver,
            work: WorkMap::new(),
        }
    }

    /// Append one solved round. Factor keys arrive in ascending numeric
    /// order from the factoring backend and keep that order here.
    pub fn add_round(&mut self, num: &BigUint, factors: &BTreeMap<BigUint, u32>) {
        let stored: IndexMap<String, u32> = factors
            .iter()
            .map(|(p, m)| (p.to_str_radix(10), *m))
            .collect();
        self.work.insert(num.to_str_radix(10), stored);
    }

    pub fn rounds(&self) -> usize {
        self.work.len()
    }
}

// ── Prefix views ─────────────────────────────────────────────────────────────

/// Serialization view of a PoW restricted to its first `rounds` entries;
/// this is what each round's hash binds to.
#[derive(Serialize)]
pub(crate) struct PowPrefix<'a> {
    pub solver: &'a PubKey,
    pub work: WorkPrefix<'a>,
}

pub(crate) struct WorkPrefix<'a> {
    pub work: &'a WorkMap,
    pub rounds: usize,
}

impl Serialize for WorkPrefix<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let n = self.rounds.min(self.work.len());
        let mut map = serializer.serialize_map(Some(n))?;
        for (num, factors) in self.work.iter().take(n) {
            map.serialize_entry(num, factors)?;
        }
        map.end()
    }
}
