use std::fmt;

// ── Transaction checks ───────────────────────────────────────────────────────

/// Outcome of validating a single transaction against the current chain.
/// Not an error type: rejection is a normal, logged consensus event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransCheck {
    Ok,
    /// Recomputed hash disagrees with the embedded one.
    InvalidHash,
    /// Signature verification failed, or a non-Reward act has no sender.
    InvalidSign,
    /// A transaction with this hash already sits in an accepted block.
    InChain,
    /// Payment larger than the sender's derived balance.
    InsufficientCoins,
    /// Reward referencing an unknown block, the wrong solver, or the wrong
    /// amount.
    RewardNotFound,
}

impl fmt::Display for TransCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            TransCheck::Ok => "ok",
            TransCheck::InvalidHash => "invalid hash",
            TransCheck::InvalidSign => "invalid digital signature",
            TransCheck::InChain => "transaction already in blockchain",
            TransCheck::InsufficientCoins => "insufficient coins",
            TransCheck::RewardNotFound => "reward block not found",
        };
        write!(f, "{msg}")
    }
}

// ── Block checks ─────────────────────────────────────────────────────────────

/// Outcome of validating a block before it may gather confirmations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockCheck {
    Ok,
    InvalidHash,
    /// `prev` names a block the chain has not accepted.
    PrevNotFound,
    /// `h_diff` off the retarget schedule, below the minimum, or `v_diff`
    /// disagreeing with the difficulty curve.
    InvalidDiff,
    PowFailed,
    InChain,
    /// Another block with the same `prev` already won this height.
    AlreadySolved,
    /// A contained transaction failed; carries its reason.
    Trans(TransCheck),
}

impl fmt::Display for BlockCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockCheck::Ok => write!(f, "ok"),
            BlockCheck::InvalidHash => write!(f, "invalid hash"),
            BlockCheck::PrevNotFound => write!(f, "previous block not found"),
            BlockCheck::InvalidDiff => write!(f, "invalid block difficulty"),
            BlockCheck::PowFailed => write!(f, "proof of work was failed"),
            BlockCheck::InChain => write!(f, "already in blockchain"),
            BlockCheck::AlreadySolved => write!(f, "already solved"),
            BlockCheck::Trans(reason) => write!(f, "{reason}"),
        }
    }
}
