//! Node state and message handling.
//!
//! All mutable state (chain, peer set, pending-transaction cache) sits
//! behind one mutex. The network loop and the mining thread both take it
//! for short critical sections; the mutex is never held across a factoring
//! call or a socket operation.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use pico_chain::{BlockAdmission, Blockchain};
use pico_core::act::Act;
use pico_core::block::Block;
use pico_core::transaction::Transaction;
use pico_crypto::User;
use pico_miner::Miner;
use pico_p2p::{network, Envelope, Net, Peer};

use crate::storage;

/// How often a solved block is re-announced while waiting for its
/// confirmations.
const REANNOUNCE_INTERVAL: Duration = Duration::from_secs(2);

// ── Shared state ─────────────────────────────────────────────────────────────

pub struct Shared {
    pub chain: Blockchain,
    pub net: Net,
    /// Transactions waiting for the next candidate block (mining nodes).
    pub pending: Vec<Transaction>,
}

pub struct StatePaths {
    pub chain: PathBuf,
    pub peers: PathBuf,
}

// ── Node ─────────────────────────────────────────────────────────────────────

pub struct Node {
    pub user: User,
    pub shared: Arc<Mutex<Shared>>,
    pub paths: StatePaths,
    pub mining: bool,
    outbound: mpsc::UnboundedSender<Envelope>,
}

impl Node {
    /// Wire up the node and return the receiver half of the outbound
    /// channel; pass it to [`outbound_loop`].
    pub fn new(
        user: User,
        chain: Blockchain,
        net: Net,
        paths: StatePaths,
        mining: bool,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Envelope>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let node = Arc::new(Self {
            user,
            shared: Arc::new(Mutex::new(Shared {
                chain,
                net,
                pending: Vec::new(),
            })),
            paths,
            mining,
            outbound,
        });
        (node, outbound_rx)
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().expect("state mutex poisoned")
    }

    /// Queue an envelope for best-effort broadcast.
    pub fn send(&self, envelope: Envelope) {
        let _ = self.outbound.send(envelope);
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// State files must never go stale silently; a node that cannot write
    /// its chain is not a node any more.
    fn persist_chain(&self, shared: &Shared) {
        if let Err(e) = storage::save(&self.paths.chain, &shared.chain) {
            error!(error = %e, "failed to persist blockchain");
            std::process::exit(1);
        }
    }

    fn persist_peers(&self, shared: &Shared) {
        if let Err(e) = storage::save(&self.paths.peers, &shared.net) {
            error!(error = %e, "failed to persist peers");
            std::process::exit(1);
        }
    }

    // ── Startup ──────────────────────────────────────────────────────────────

    /// Join the gossip: record the local endpoint in the peer set, persist
    /// it and announce the full list.
    pub fn announce_self(&self) {
        let snapshot = {
            let mut shared = self.lock();
            let me = shared
                .net
                .local()
                .cloned()
                .expect("local endpoint set before announce");
            shared.net.update_peer(me);
            self.persist_peers(&shared);
            shared.net.peers.clone()
        };
        self.send(Envelope::peers(snapshot));
    }

    /// Sign, broadcast and (on mining nodes) queue a user-issued
    /// transaction.
    pub fn submit_trans(&self, tx: Transaction) {
        info!(trans = %tx.hash.short(), "broadcasting transaction");
        self.send(Envelope::trans(tx.clone()));
        if self.mining {
            self.lock().pending.push(tx);
        }
    }

    // ── Inbound dispatch ─────────────────────────────────────────────────────

    /// Handlers run in a deterministic order: peers, block, trans.
    pub fn dispatch(&self, envelope: Envelope) {
        if let Some(peers) = envelope.peers {
            self.handle_peers(peers);
        }
        if let Some(block) = envelope.block {
            self.handle_block(block);
        }
        if let Some(trans) = envelope.trans {
            self.handle_trans(trans);
        }
    }

    /// Union gossiped peers in; growth triggers a full-list rebroadcast
    /// (and persistence), so the union converges to a network-wide fixed
    /// point.
    fn handle_peers(&self, peers: Vec<Peer>) {
        let snapshot = {
            let mut shared = self.lock();
            if !shared.net.update_peers(peers) {
                return;
            }
            self.persist_peers(&shared);
            shared.net.peers.clone()
        };
        info!(peers = snapshot.len(), "peer set updated");
        self.send(Envelope::peers(snapshot));
    }

    /// Submit an inbound block. Anything that passes validation is
    /// re-broadcast, even before acceptance; that amplification is what
    /// turns a single announcement into six confirmations.
    fn handle_block(&self, block: Block) {
        let admission = {
            let mut shared = self.lock();
            let admission = shared.chain.add_block(&block);
            if admission == BlockAdmission::Accepted {
                self.persist_chain(&shared);
            }
            admission
        };
        if !admission.is_rejected() {
            self.send(Envelope::block(block));
        }
    }

    /// Mining nodes queue inbound transactions for the next candidate
    /// block; validation happens when the block is assembled.
    fn handle_trans(&self, trans: Transaction) {
        if !self.mining {
            return;
        }
        info!(trans = %trans.hash.short(), "transaction will be in next block");
        self.lock().pending.push(trans);
    }

    // ── Mining ───────────────────────────────────────────────────────────────

    pub fn spawn_mining(self: &Arc<Self>) {
        let node = Arc::clone(self);
        std::thread::Builder::new()
            .name("pico-miner".into())
            .spawn(move || node.mining_loop())
            .expect("failed to spawn mining thread");
    }

    fn mining_loop(&self) {
        let miner = Miner::new();
        loop {
            // Assemble a candidate on the current tip, draining the cache.
            // Invalid pending transactions are dropped here with a log line.
            let mut block = {
                let mut shared = self.lock();
                let mut block = shared.chain.new_block(self.user.public.clone());
                for tx in std::mem::take(&mut shared.pending) {
                    let _ = shared.chain.add_trans(&mut block, tx);
                }
                block
            };

            // The factoring rounds run with the lock dropped; inbound
            // traffic keeps flowing while we grind.
            miner.work(&mut block);
            info!(
                block = %block.hash.short(),
                reward = block.reward(),
                "block solved"
            );

            if self.submit_solved(&block) {
                self.await_terminal(&block);
            }
        }
    }

    /// First submission of a locally solved block. On success the solver's
    /// Reward transaction is minted and queued for the *next* block, and
    /// both the block and the reward hit the wire.
    fn submit_solved(&self, block: &Block) -> bool {
        let reward_tx = {
            let mut shared = self.lock();
            let admission = shared.chain.add_block(block);
            if admission.is_rejected() {
                // Someone else won the height while we were factoring.
                warn!(block = %block.hash.short(), "solved block is stale");
                return false;
            }
            if admission == BlockAdmission::Accepted {
                self.persist_chain(&shared);
            }

            let reward_tx = Transaction::new(
                None,
                self.user.public.clone(),
                Act::Reward {
                    rew: block.reward(),
                    blk: block.hash.clone(),
                },
            );
            shared.pending.push(reward_tx.clone());
            reward_tx
        };

        self.send(Envelope::block(block.clone()));
        self.send(Envelope::trans(reward_tx));
        true
    }

    /// Re-announce the submitted block until it reaches a terminal state:
    /// accepted into the chain, or its confirmation cell evicted because a
    /// rival block won. Each local re-announcement also counts one
    /// confirmation, so an isolated node still converges.
    fn await_terminal(&self, block: &Block) {
        loop {
            {
                let mut shared = self.lock();
                if shared.chain.get_block(&block.hash).is_some() {
                    return;
                }
                if shared.chain.get_block_confirms(block).is_none() {
                    return;
                }
                match shared.chain.add_block(block) {
                    BlockAdmission::Accepted => {
                        self.persist_chain(&shared);
                        // Fall through to one final broadcast below.
                    }
                    BlockAdmission::Rejected(_) => return,
                    BlockAdmission::Pending(_) => {}
                }
            }
            self.send(Envelope::block(block.clone()));
            std::thread::sleep(REANNOUNCE_INTERVAL);
        }
    }
}

// ── Outbound loop ────────────────────────────────────────────────────────────

/// Drain the outbound queue, snapshotting the peer list per envelope so the
/// lock is never held across a dial.
pub async fn outbound_loop(
    node: Arc<Node>,
    mut outbound_rx: mpsc::UnboundedReceiver<Envelope>,
) {
    while let Some(envelope) = outbound_rx.recv().await {
        let (peers, local) = {
            let shared = node.lock();
            (shared.net.peers.clone(), shared.net.local().cloned())
        };
        network::broadcast(&peers, local.as_ref(), &envelope).await;
    }
}
