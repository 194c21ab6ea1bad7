//! Sequential proof-of-work solver.
//!
//! Each round hashes the block with every earlier round present, so rounds
//! cannot be parallelised; the miner's entire job is to factor one integer
//! after another and append the results in order. The miner holds no state
//! beyond the block it is handed.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use tracing::debug;

use pico_core::block::Block;

#[derive(Default)]
pub struct Miner;

impl Miner {
    pub fn new() -> Self {
        Self
    }

    /// Solve every remaining round with the default factoring backend.
    /// On return `block.work_check()` holds.
    pub fn work(&self, block: &mut Block) {
        Self::work_with(block, pico_factor::factor);
    }

    /// Solve every remaining round with a caller-supplied factoring
    /// routine. Picks up where the block's work left off, so a partially
    /// solved block is completed rather than restarted.
    pub fn work_with(block: &mut Block, mut factor: impl FnMut(&BigUint) -> BTreeMap<BigUint, u32>) {
        let total = block.v_diff as usize;
        for round in block.pow.rounds()..total {
            let num = block.extract(round);
            let factors = factor(&num);
            block.add_round(&num, &factors);
            debug!(round = round + 1, total, "solved round");
        }
    }
}
