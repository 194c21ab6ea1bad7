//! ─── PicoCoin Protocol Constants ────────────────────────────────────────────
//!
//! Coin:   PicoCoin
//! Chain:  single tip, first block at a height wins
//! PoW:    prime-factorization puzzle bound to the block serialization

// ── Chain identity ───────────────────────────────────────────────────────────

/// Coin name embedded in (and hashed into) every chain snapshot.
pub const COIN_NAME: &str = "PicoCoin";

/// Protocol version string.
pub const CHAIN_VERSION: &str = "0.1";

// ── Difficulty ───────────────────────────────────────────────────────────────

/// Genesis horizontal difficulty: how many leading hash bytes form the
/// round's target integer. Also the consensus minimum.
pub const H_DIFF_INIT: u32 = 14;

/// Exponent base of the vertical-difficulty curve:
/// `v_diff = max(1, 2^(13 - 3 * h_diff / 8))`.
pub const V_DIFF_EXP_BASE: u32 = 13;

/// Every this many accepted blocks, the expected `h_diff` grows by one.
pub const H_DIFF_RETARGET_INTERVAL: u64 = 10_000;

// ── Confirmation protocol ────────────────────────────────────────────────────

/// Re-announcements required before a pending block is durable.
pub const BLOCK_REQUIRED_CONFIRMS: u32 = 6;

// ── Network ──────────────────────────────────────────────────────────────────

/// Default gossip listen port (TCP over IPv6).
pub const DEFAULT_PORT: u16 = 10_000;

/// Hard cap on a single inbound frame after inflation would exceed memory;
/// the compressed read stops here.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Dial timeout per peer (seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Inbound read timeout (seconds); a peer that stalls mid-frame is dropped.
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Upper bound on the gossip-grown peer list; oldest entries are evicted.
pub const MAX_PEERS: usize = 1024;
