use std::collections::BTreeMap;

use indexmap::IndexMap;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::constants::{H_DIFF_INIT, V_DIFF_EXP_BASE};
use crate::pow::{PowPrefix, ProofOfWork, WorkPrefix};
use crate::transaction::Transaction;
use crate::types::{utc_timestamp, Hash, PubKey};

// ── Difficulty curve ─────────────────────────────────────────────────────────

/// Vertical difficulty for a horizontal difficulty under a custom exponent
/// base: `max(1, 2^(base - 3·h_diff/8))` with integer division.
pub fn v_diff_with_base(base: u32, h_diff: u32) -> u32 {
    let spent = 3 * h_diff / 8;
    if spent >= base {
        1
    } else {
        1u32 << (base - spent).min(31)
    }
}

/// Consensus vertical-difficulty formula.
pub fn v_diff_for(h_diff: u32) -> u32 {
    v_diff_with_base(V_DIFF_EXP_BASE, h_diff)
}

/// Reward value for solving a block: `2^(8 − 8·(h_diff − 14)/50)` picocoins.
pub fn reward_for(h_diff: u32) -> f64 {
    let delta = h_diff as f64 - H_DIFF_INIT as f64;
    2f64.powf(8.0 - 8.0 * delta / 50.0)
}

// ── Block ────────────────────────────────────────────────────────────────────

/// One block: header fields, the transaction set, and the embedded PoW.
///
/// `trans` is keyed by transaction hash and, like `pow.work`, hashes in
/// insertion order. The block hash covers every field but `hash`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Block {
    /// Hash of the previous block, or null for genesis.
    pub prev: Option<Hash>,

    /// UTC creation time, `YYYY-MM-DD HH:MM:SS.ffffff`.
    pub time: String,

    /// Horizontal difficulty: leading hash bytes forming each round integer.
    pub h_diff: u32,

    /// Vertical difficulty: number of sequential PoW rounds.
    pub v_diff: u32,

    pub trans: IndexMap<Hash, Transaction>,

    pub pow: ProofOfWork,

    pub hash: Hash,
}

/// Hashing view: the block minus `hash`, with the PoW truncated to a round
/// prefix. The full-prefix form is the block body; shorter prefixes are the
/// per-round puzzle inputs.
#[derive(Serialize)]
struct BlockBody<'a> {
    prev: &'a Option<Hash>,
    time: &'a str,
    h_diff: u32,
    v_diff: u32,
    trans: &'a IndexMap<Hash, Transaction>,
    pow: PowPrefix<'a>,
}

impl Block {
    pub fn new(prev: Option<Hash>, h_diff: u32, v_diff: u32, solver: PubKey) -> Self {
        let mut block = Self {
            prev,
            time: utc_timestamp(),
            h_diff,
            v_diff,
            trans: IndexMap::new(),
            pow: ProofOfWork::new(solver),
            hash: Hash::default(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Insert a transaction by its hash if absent, then re-hash.
    /// Returns false when the transaction was already present.
    pub fn add_trans(&mut self, tx: Transaction) -> bool {
        if self.trans.contains_key(&tx.hash) {
            return false;
        }
        self.trans.insert(tx.hash.clone(), tx);
        self.hash = self.compute_hash();
        true
    }

    /// Append one solved PoW round, then re-hash.
    pub fn add_round(&mut self, num: &BigUint, factors: &BTreeMap<BigUint, u32>) {
        self.pow.add_round(num, factors);
        self.hash = self.compute_hash();
    }

    pub fn reward(&self) -> f64 {
        reward_for(self.h_diff)
    }

    fn body(&self, rounds: usize) -> BlockBody<'_> {
        BlockBody {
            prev: &self.prev,
            time: &self.time,
            h_diff: self.h_diff,
            v_diff: self.v_diff,
            trans: &self.trans,
            pow: PowPrefix {
                solver: &self.pow.solver,
                work: WorkPrefix {
                    work: &self.pow.work,
                    rounds,
                },
            },
        }
    }

    /// Canonical bytes of the block with only the first `rounds` work
    /// entries present: the input hashed by round `rounds`.
    pub fn round_bytes(&self, rounds: usize) -> Vec<u8> {
        canonical::to_bytes(&self.body(rounds))
    }

    pub fn compute_hash(&self) -> Hash {
        canonical::digest(&self.body(self.pow.rounds()))
    }

    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    // ── Proof-of-work verification ───────────────────────────────────────────

    /// The target integer of round `i`: the first `h_diff` bytes of
    /// SHA3-256 over the block serialized with rounds `0..i`, read
    /// little-endian.
    pub fn extract(&self, round: usize) -> BigUint {
        let digest = canonical::sha3_256(&self.round_bytes(round));
        let take = (self.h_diff as usize).min(digest.len());
        BigUint::from_bytes_le(&digest[..take])
    }

    /// Re-derive round `i` from the stored prefix and check the stored
    /// factorization: every key prime, prime-power product equal to the
    /// extracted integer.
    pub fn check_round(&self, round: usize) -> bool {
        let factors = match self.pow.work.get_index(round) {
            Some((_, factors)) => factors,
            None => return false,
        };

        let mut product = BigUint::from(1u32);
        for (prime, mult) in factors {
            let prime = match BigUint::parse_bytes(prime.as_bytes(), 10) {
                Some(p) => p,
                None => return false,
            };
            if !pico_factor::is_prime(&prime) {
                return false;
            }
            product *= prime.pow(*mult);
        }
        product == self.extract(round)
    }

    /// Verify all `v_diff` rounds.
    pub fn work_check(&self) -> bool {
        (0..self.v_diff as usize).all(|i| self.check_round(i))
    }
}
