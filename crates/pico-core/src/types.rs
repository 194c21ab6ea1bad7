use serde::{Deserialize, Serialize};
use std::fmt;

// ── Hash ─────────────────────────────────────────────────────────────────────

/// Lowercase-hex SHA3-256 digest of an object's canonical serialization.
///
/// Hashes travel on the wire and key the `trans`/`blocks` maps, so the
/// textual form *is* the identity; no raw-byte representation is kept.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hash(String);

impl Hash {
    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn new(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 12-character prefix used in log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({}…)", self.short())
    }
}

// ── PubKey ───────────────────────────────────────────────────────────────────

/// Base-58 encoding of a 64-byte uncompressed secp256k1 public key (x ‖ y).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PubKey(String);

impl PubKey {
    pub fn new(b58: String) -> Self {
        Self(b58)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey({}…)", self.short())
    }
}

// ── Timestamps ───────────────────────────────────────────────────────────────

/// Current UTC time in the canonical `YYYY-MM-DD HH:MM:SS.ffffff` form.
pub fn utc_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}
