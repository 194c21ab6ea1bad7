use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use pico_core::act::Act;
use pico_core::block::Block;
use pico_core::canonical;
use pico_core::constants::COIN_NAME;
use pico_core::transaction::Transaction;
use pico_core::types::{Hash, PubKey};
use pico_crypto::verify_transaction;

use crate::check::{BlockCheck, TransCheck};
use crate::params::ChainParams;

// ── Admission ────────────────────────────────────────────────────────────────

/// What `add_block` did with a submission.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockAdmission {
    /// Reached the confirmation threshold and is now durable.
    Accepted,
    /// Valid, counted, still gathering confirmations.
    Pending(u32),
    /// Failed validation; its confirmation cell was evicted.
    Rejected(BlockCheck),
}

impl BlockAdmission {
    pub fn is_rejected(&self) -> bool {
        matches!(self, BlockAdmission::Rejected(_))
    }
}

// ── Blockchain ───────────────────────────────────────────────────────────────

/// The accepted chain plus the ephemeral confirmation table.
///
/// `blocks` is insertion-ordered and that order is consensus-relevant:
/// `last_block` is the newest entry and the chain hash covers the order, so
/// a reload from disk must preserve it (IndexMap + ordered JSON do).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Blockchain {
    pub coin: String,
    pub ver: String,
    pub blocks: IndexMap<Hash, Block>,
    pub hash: Hash,

    /// prev-hash → block-hash → confirmation count. Never persisted;
    /// confirmations restart on reboot.
    #[serde(skip)]
    confirm_table: HashMap<Option<Hash>, HashMap<Hash, u32>>,

    #[serde(skip)]
    params: ChainParams,
}

/// Hashing view: the chain minus `hash`.
#[derive(Serialize)]
struct BlockchainBody<'a> {
    coin: &'a str,
    ver: &'a str,
    blocks: &'a IndexMap<Hash, Block>,
}

impl Blockchain {
    pub fn new(ver: &str) -> Self {
        Self::with_params(ver, ChainParams::default())
    }

    pub fn with_params(ver: &str, params: ChainParams) -> Self {
        let mut chain = Self {
            coin: COIN_NAME.to_string(),
            ver: ver.to_string(),
            blocks: IndexMap::new(),
            hash: Hash::default(),
            confirm_table: HashMap::new(),
            params,
        };
        chain.hash = chain.compute_hash();
        chain
    }

    /// Swap in non-default consensus parameters (e.g. after deserializing).
    pub fn set_params(&mut self, params: ChainParams) {
        self.params = params;
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn compute_hash(&self) -> Hash {
        canonical::digest(&BlockchainBody {
            coin: &self.coin,
            ver: &self.ver,
            blocks: &self.blocks,
        })
    }

    /// Refresh the embedded hash; called after mutations and before
    /// persisting.
    pub fn refresh_hash(&mut self) {
        self.hash = self.compute_hash();
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    /// The most recently accepted block.
    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.values().last()
    }

    pub fn blocks_count(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn get_block(&self, hash: &Hash) -> Option<&Block> {
        self.blocks.get(hash)
    }

    /// Every occurrence of a transaction hash across accepted blocks.
    pub fn get_trans(&self, hash: &Hash) -> Vec<&Transaction> {
        self.blocks
            .values()
            .filter_map(|block| block.trans.get(hash))
            .collect()
    }

    /// Pending confirmation count for a block, if it has a live cell.
    pub fn get_block_confirms(&self, block: &Block) -> Option<u32> {
        self.confirm_table
            .get(&block.prev)?
            .get(&block.compute_hash())
            .copied()
    }

    /// Derived balance: payments in minus payments out plus rewards, over
    /// accepted blocks only.
    pub fn balance(&self, key: &PubKey) -> f64 {
        let mut total = 0.0;
        for block in self.blocks.values() {
            for tx in block.trans.values() {
                match &tx.act {
                    Act::Payment { pay } => {
                        if &tx.to == key {
                            total += *pay as f64;
                        } else if tx.from.as_ref() == Some(key) {
                            total -= *pay as f64;
                        }
                    }
                    Act::Reward { rew, .. } => {
                        if &tx.to == key {
                            total += rew;
                        }
                    }
                    Act::Invoice { .. } | Act::Message { .. } => {}
                }
            }
        }
        total
    }

    // ── Difficulty schedule ──────────────────────────────────────────────────

    /// Expected `h_diff` for a successor of `prev`: the genesis value with
    /// no predecessor, else the predecessor's, bumped by one on every
    /// retarget boundary.
    pub fn expected_h_diff(&self, prev: Option<&Block>) -> u32 {
        match prev {
            None => self.params.h_diff_init,
            Some(prev) => {
                let bump = self.blocks_count() % self.params.retarget_interval == 0;
                prev.h_diff + u32::from(bump)
            }
        }
    }

    /// Fresh candidate block on the current tip for `solver`.
    pub fn new_block(&self, solver: PubKey) -> Block {
        let prev = self.last_block();
        let h_diff = self.expected_h_diff(prev);
        let v_diff = self.params.v_diff_for(h_diff);
        let prev_hash = prev.map(|b| b.hash.clone());
        Block::new(prev_hash, h_diff, v_diff, solver)
    }

    // ── Validation ───────────────────────────────────────────────────────────

    pub fn check_trans(&self, tx: &Transaction) -> TransCheck {
        let (hash_ok, sig_ok) = verify_transaction(tx);
        if !hash_ok {
            return TransCheck::InvalidHash;
        }
        match &tx.from {
            Some(_) if !sig_ok => return TransCheck::InvalidSign,
            // A null sender is the Reward envelope; anything else cannot
            // carry a valid signature.
            None if !tx.act.is_reward() => return TransCheck::InvalidSign,
            _ => {}
        }

        if !self.get_trans(&tx.hash).is_empty() {
            return TransCheck::InChain;
        }

        if let (Act::Payment { pay }, Some(from)) = (&tx.act, &tx.from) {
            if self.balance(from) < *pay as f64 {
                return TransCheck::InsufficientCoins;
            }
        }

        if let Act::Reward { rew, blk } = &tx.act {
            match self.get_block(blk) {
                Some(rewarded) if rewarded.pow.solver == tx.to && rewarded.reward() == *rew => {}
                _ => return TransCheck::RewardNotFound,
            }
        }

        TransCheck::Ok
    }

    pub fn check_block(&self, block: &Block) -> BlockCheck {
        if !block.verify_hash() {
            return BlockCheck::InvalidHash;
        }

        let prev = block.prev.as_ref().and_then(|h| self.get_block(h));
        if block.prev.is_some() && prev.is_none() {
            return BlockCheck::PrevNotFound;
        }

        if block.h_diff != self.expected_h_diff(prev)
            || block.h_diff < self.params.h_diff_init
            || block.v_diff != self.params.v_diff_for(block.h_diff)
        {
            return BlockCheck::InvalidDiff;
        }

        if !block.work_check() {
            return BlockCheck::PowFailed;
        }

        if self.blocks.contains_key(&block.hash) {
            return BlockCheck::InChain;
        }

        // First block at a height wins; there is no fork resolution.
        if self.blocks.values().any(|b| b.prev == block.prev) {
            return BlockCheck::AlreadySolved;
        }

        for tx in block.trans.values() {
            let reason = self.check_trans(tx);
            if reason != TransCheck::Ok {
                return BlockCheck::Trans(reason);
            }
        }

        BlockCheck::Ok
    }

    // ── Mutation ─────────────────────────────────────────────────────────────

    /// Validate a transaction against the chain, then insert it into a
    /// candidate block.
    pub fn add_trans(&self, block: &mut Block, tx: Transaction) -> Result<(), TransCheck> {
        let hash = tx.hash.clone();
        let reason = self.check_trans(&tx);
        if reason != TransCheck::Ok {
            warn!(trans = %hash.short(), %reason, "transaction rejected");
            return Err(reason);
        }
        block.add_trans(tx);
        info!(trans = %hash.short(), "transaction accepted");
        Ok(())
    }

    /// Submit one observation of a block.
    ///
    /// Every successful call counts one confirmation; the block becomes
    /// durable at the threshold. A failed check evicts the confirmation
    /// cell so a later, corrected submission starts from zero.
    pub fn add_block(&mut self, block: &Block) -> BlockAdmission {
        let hash = block.compute_hash();

        self.confirm_table
            .entry(block.prev.clone())
            .or_default()
            .entry(hash.clone())
            .or_insert(0);

        let reason = self.check_block(block);
        if reason != BlockCheck::Ok {
            warn!(block = %hash.short(), %reason, "block rejected");
            if let Some(cells) = self.confirm_table.get_mut(&block.prev) {
                cells.remove(&hash);
            }
            return BlockAdmission::Rejected(reason);
        }

        let count = {
            let cell = self
                .confirm_table
                .get_mut(&block.prev)
                .and_then(|cells| cells.get_mut(&hash))
                .expect("confirmation cell was just created");
            *cell += 1;
            *cell
        };
        info!(block = %hash.short(), confirms = count, "block confirms");

        if count >= self.params.required_confirms {
            self.blocks.insert(hash.clone(), block.clone());
            if let Some(cells) = self.confirm_table.get_mut(&block.prev) {
                cells.remove(&hash);
            }
            self.refresh_hash();
            info!(block = %hash.short(), height = self.blocks_count(), "block accepted to blockchain");
            return BlockAdmission::Accepted;
        }

        BlockAdmission::Pending(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> ChainParams {
        ChainParams {
            h_diff_init: 3,
            v_diff_exp_base: 0,
            retarget_interval: 10_000,
            required_confirms: 6,
        }
    }

    fn solver() -> PubKey {
        PubKey::new("test-solver".into())
    }

    fn mine(block: &mut Block) {
        for i in 0..block.v_diff as usize {
            let num = block.extract(i);
            let factors = pico_factor::factor(&num);
            block.add_round(&num, &factors);
        }
    }

    fn accept(chain: &mut Blockchain, block: &Block) {
        for _ in 0..5 {
            assert!(matches!(chain.add_block(block), BlockAdmission::Pending(_)));
        }
        assert_eq!(chain.add_block(block), BlockAdmission::Accepted);
    }

    #[test]
    fn empty_chain_has_identity() {
        let chain = Blockchain::new("0.1");
        assert_eq!(chain.coin, "PicoCoin");
        assert!(chain.last_block().is_none());
        assert_eq!(chain.blocks_count(), 0);
        assert_eq!(chain.hash, chain.compute_hash());
    }

    #[test]
    fn six_confirmations_promote_a_block() {
        let mut chain = Blockchain::with_params("0.1", test_params());
        let mut block = chain.new_block(solver());
        mine(&mut block);

        for expect in 1..=5u32 {
            assert_eq!(chain.add_block(&block), BlockAdmission::Pending(expect));
            assert_eq!(chain.get_block_confirms(&block), Some(expect));
        }
        assert_eq!(chain.add_block(&block), BlockAdmission::Accepted);
        assert_eq!(chain.blocks_count(), 1);
        // The cell is gone once the block is durable.
        assert_eq!(chain.get_block_confirms(&block), None);
    }

    #[test]
    fn accepted_block_resubmission_is_in_chain() {
        let mut chain = Blockchain::with_params("0.1", test_params());
        let mut block = chain.new_block(solver());
        mine(&mut block);
        accept(&mut chain, &block);

        assert_eq!(
            chain.add_block(&block),
            BlockAdmission::Rejected(BlockCheck::InChain)
        );
    }

    #[test]
    fn first_block_at_a_height_wins() {
        let mut chain = Blockchain::with_params("0.1", test_params());
        let mut winner = chain.new_block(solver());
        mine(&mut winner);
        let mut rival = chain.new_block(PubKey::new("rival".into()));
        mine(&mut rival);
        assert_ne!(winner.hash, rival.hash);

        accept(&mut chain, &winner);
        assert_eq!(
            chain.add_block(&rival),
            BlockAdmission::Rejected(BlockCheck::AlreadySolved)
        );
        assert_eq!(chain.blocks_count(), 1);
    }

    #[test]
    fn unknown_predecessor_is_rejected_not_queued() {
        let mut chain = Blockchain::with_params("0.1", test_params());
        let mut orphan = Block::new(Some(Hash::from_digest([9; 32])), 3, 1, solver());
        mine(&mut orphan);

        assert_eq!(
            chain.add_block(&orphan),
            BlockAdmission::Rejected(BlockCheck::PrevNotFound)
        );
        // Eviction means a later resubmission starts over at one.
        assert_eq!(chain.get_block_confirms(&orphan), None);
    }

    #[test]
    fn wrong_difficulty_is_rejected() {
        let mut chain = Blockchain::with_params("0.1", test_params());
        let mut block = Block::new(None, 4, 1, solver());
        mine(&mut block);
        assert_eq!(
            chain.add_block(&block),
            BlockAdmission::Rejected(BlockCheck::InvalidDiff)
        );

        let mut wrong_v = Block::new(None, 3, 2, solver());
        mine(&mut wrong_v);
        assert_eq!(
            chain.add_block(&wrong_v),
            BlockAdmission::Rejected(BlockCheck::InvalidDiff)
        );
    }

    #[test]
    fn missing_work_is_pow_failure() {
        let mut chain = Blockchain::with_params("0.1", test_params());
        let block = chain.new_block(solver());
        assert_eq!(
            chain.add_block(&block),
            BlockAdmission::Rejected(BlockCheck::PowFailed)
        );
    }

    #[test]
    fn retarget_boundary_bumps_h_diff() {
        let mut params = test_params();
        params.retarget_interval = 2;
        let mut chain = Blockchain::with_params("0.1", params);

        let mut genesis = chain.new_block(solver());
        mine(&mut genesis);
        accept(&mut chain, &genesis);

        // count = 1 → no bump yet.
        let b2 = chain.new_block(solver());
        assert_eq!(b2.h_diff, 3);
        let mut b2 = b2;
        mine(&mut b2);
        accept(&mut chain, &b2);

        // count = 2 → boundary: the next block must step up.
        let b3 = chain.new_block(solver());
        assert_eq!(b3.h_diff, 4);
    }

    #[test]
    fn chain_survives_a_disk_round_trip() {
        let mut chain = Blockchain::with_params("0.1", test_params());
        let mut genesis = chain.new_block(solver());
        mine(&mut genesis);
        accept(&mut chain, &genesis);
        let mut b2 = chain.new_block(solver());
        mine(&mut b2);
        accept(&mut chain, &b2);

        let json = serde_json::to_string_pretty(&chain).unwrap();
        let mut reloaded: Blockchain = serde_json::from_str(&json).unwrap();
        reloaded.set_params(test_params());

        assert_eq!(reloaded.blocks_count(), 2);
        assert_eq!(reloaded.last_block().unwrap().hash, b2.hash);
        assert_eq!(reloaded.hash, reloaded.compute_hash());
        // Confirmations are ephemeral: a fresh table after reload.
        assert_eq!(reloaded.get_block_confirms(&b2), None);
    }
}
