use serde::{Deserialize, Serialize};

use crate::act::Act;
use crate::canonical;
use crate::types::{utc_timestamp, Hash, PubKey};

// ── Transaction ──────────────────────────────────────────────────────────────

/// A signed transfer of value (or message) between two keys.
///
/// Field order is the canonical hashing order. The hash covers everything
/// but `hash` itself, including `sign` once it is present, so the hash is
/// recomputed after signing. The signature covers the body minus both
/// `sign` and `hash`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// UTC creation time, `YYYY-MM-DD HH:MM:SS.ffffff`.
    pub time: String,

    /// Sender public key; null only for Reward acts.
    pub from: Option<PubKey>,

    /// Recipient public key.
    pub to: PubKey,

    pub act: Act,

    /// Base-58 of the 64-byte raw ECDSA signature, or null before signing.
    pub sign: Option<String>,

    pub hash: Hash,
}

/// Signing view: the transaction minus `sign` and `hash`.
#[derive(Serialize)]
pub struct TransactionSignable<'a> {
    pub time: &'a str,
    pub from: &'a Option<PubKey>,
    pub to: &'a PubKey,
    pub act: &'a Act,
}

/// Hashing view: the transaction minus `hash` only.
#[derive(Serialize)]
struct TransactionBody<'a> {
    time: &'a str,
    from: &'a Option<PubKey>,
    to: &'a PubKey,
    act: &'a Act,
    sign: &'a Option<String>,
}

impl Transaction {
    /// Build an unsigned transaction stamped with the current UTC time and
    /// hash it immediately.
    pub fn new(from: Option<PubKey>, to: PubKey, act: Act) -> Self {
        let mut tx = Self {
            time: utc_timestamp(),
            from,
            to,
            act,
            sign: None,
            hash: Hash::default(),
        };
        tx.hash = tx.compute_hash();
        tx
    }

    fn signable(&self) -> TransactionSignable<'_> {
        TransactionSignable {
            time: &self.time,
            from: &self.from,
            to: &self.to,
            act: &self.act,
        }
    }

    /// Canonical bytes covered by the ECDSA signature.
    pub fn signable_bytes(&self) -> Vec<u8> {
        canonical::to_bytes(&self.signable())
    }

    /// Recompute the canonical hash from the current field values.
    pub fn compute_hash(&self) -> Hash {
        canonical::digest(&TransactionBody {
            time: &self.time,
            from: &self.from,
            to: &self.to,
            act: &self.act,
            sign: &self.sign,
        })
    }

    /// Attach a signature, then refresh the hash to cover it.
    pub fn apply_sign(&mut self, sign: String) {
        self.sign = Some(sign);
        self.hash = self.compute_hash();
    }

    /// True when the embedded hash matches the recomputed one.
    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tag: &str) -> PubKey {
        PubKey::new(format!("k-{tag}"))
    }

    #[test]
    fn new_transaction_is_hashed() {
        let tx = Transaction::new(Some(key("a")), key("b"), Act::Payment { pay: 10 });
        assert!(tx.verify_hash());
        assert!(tx.sign.is_none());
    }

    #[test]
    fn signing_changes_the_hash() {
        let mut tx = Transaction::new(Some(key("a")), key("b"), Act::Payment { pay: 10 });
        let unsigned_hash = tx.hash.clone();
        tx.apply_sign("c2lnbmF0dXJl".to_string());
        assert_ne!(tx.hash, unsigned_hash);
        assert!(tx.verify_hash());
    }

    #[test]
    fn signable_bytes_exclude_sign_and_hash() {
        let mut tx = Transaction::new(Some(key("a")), key("b"), Act::Message { msg: "x".into() });
        let before = tx.signable_bytes();
        tx.apply_sign("c2ln".to_string());
        assert_eq!(tx.signable_bytes(), before);
        assert!(!String::from_utf8(before).unwrap().contains("hash"));
    }

    #[test]
    fn canonical_field_order_on_the_wire() {
        let tx = Transaction::new(None, key("b"), Act::Message { msg: "x".into() });
        let json = serde_json::to_string(&tx).unwrap();
        let time_pos = json.find("\"time\"").unwrap();
        let from_pos = json.find("\"from\"").unwrap();
        let to_pos = json.find("\"to\"").unwrap();
        let act_pos = json.find("\"act\"").unwrap();
        let sign_pos = json.find("\"sign\"").unwrap();
        let hash_pos = json.find("\"hash\"").unwrap();
        assert!(time_pos < from_pos && from_pos < to_pos);
        assert!(to_pos < act_pos && act_pos < sign_pos && sign_pos < hash_pos);
    }

    #[test]
    fn wire_round_trip_preserves_hash() {
        let mut tx = Transaction::new(Some(key("a")), key("b"), Act::Invoice { ivc: 3 });
        tx.apply_sign("c2ln".to_string());
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
        assert!(back.verify_hash());
    }

    #[test]
    fn tampering_breaks_the_hash() {
        let mut tx = Transaction::new(Some(key("a")), key("b"), Act::Payment { pay: 10 });
        tx.act = Act::Payment { pay: 9_999 };
        assert!(!tx.verify_hash());
    }
}
