use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use pico_core::canonical::{self, sha3_256};
use pico_core::transaction::Transaction;
use pico_core::types::{Hash, PubKey};

use k256::ecdsa::SigningKey;

use crate::cipher;
use crate::error::CryptoError;
use crate::keys;

// ── User ─────────────────────────────────────────────────────────────────────

/// A wallet identity: public key plus the encrypted private scalar.
///
/// Created once and never mutated. The private key only exists decrypted
/// inside a zeroizing buffer for the duration of a single operation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Base-58 of the 64-byte uncompressed secp256k1 public key.
    #[serde(rename = "pub")]
    pub public: PubKey,

    /// Base-58 of `nonce(16) ‖ ciphertext(32) ‖ tag(16)`.
    #[serde(rename = "priv")]
    pub encrypted_priv: String,

    pub hash: Hash,
}

/// Hashing view: the identity minus `hash`.
#[derive(Serialize)]
struct UserBody<'a> {
    #[serde(rename = "pub")]
    public: &'a PubKey,
    #[serde(rename = "priv")]
    encrypted_priv: &'a str,
}

impl User {
    /// Generate a fresh keypair and seal the private scalar under
    /// `password`.
    pub fn create(password: &str) -> Self {
        let (sk, public) = keys::generate();
        let scalar = Zeroizing::new(sk.to_bytes().to_vec());
        let encrypted_priv = bs58::encode(cipher::encrypt_priv(scalar.as_ref(), password))
            .into_string();

        let mut user = Self {
            public,
            encrypted_priv,
            hash: Hash::default(),
        };
        user.hash = user.compute_hash();
        user
    }

    pub fn compute_hash(&self) -> Hash {
        canonical::digest(&UserBody {
            public: &self.public,
            encrypted_priv: &self.encrypted_priv,
        })
    }

    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Attempt to decrypt the private key. Fails with `CryptoError::Auth`
    /// on a GCM tag mismatch, and with `Malformed` when the decrypted
    /// scalar does not derive `pub`.
    pub fn check_password(&self, password: &str) -> Result<(), CryptoError> {
        self.signing_key(password).map(|_| ())
    }

    fn signing_key(&self, password: &str) -> Result<SigningKey, CryptoError> {
        let blob = bs58::decode(&self.encrypted_priv)
            .into_vec()
            .map_err(|_| CryptoError::Malformed("encrypted key"))?;
        let scalar = cipher::decrypt_priv(&blob, password)?;
        let sk = SigningKey::from_slice(scalar.as_ref())
            .map_err(|_| CryptoError::Malformed("private scalar"))?;
        if keys::encode_pub(sk.verifying_key()) != self.public {
            return Err(CryptoError::Malformed("private scalar"));
        }
        Ok(sk)
    }

    /// SHA3-256 the message, sign the digest, return the base-58 raw
    /// signature.
    pub fn sign(&self, msg: &[u8], password: &str) -> Result<String, CryptoError> {
        let sk = self.signing_key(password)?;
        keys::sign_digest(&sk, &sha3_256(msg))
    }

    /// Verify a detached signature produced by [`User::sign`].
    pub fn verify(public: &PubKey, msg: &[u8], sign: &str) -> Result<(), CryptoError> {
        keys::verify_digest(public, &sha3_256(msg), sign)
    }

    /// Sign a transaction body and re-hash the transaction to cover the
    /// signature.
    pub fn sign_transaction(
        &self,
        tx: &mut Transaction,
        password: &str,
    ) -> Result<(), CryptoError> {
        let sign = self.sign(&tx.signable_bytes(), password)?;
        tx.apply_sign(sign);
        Ok(())
    }
}

/// `(hash_ok, sig_ok)` for a transaction. The signature check needs both a
/// sender and a signature; a null sender yields `sig_ok = false`, which
/// callers ignore for Reward acts.
pub fn verify_transaction(tx: &Transaction) -> (bool, bool) {
    let hash_ok = tx.verify_hash();
    let sig_ok = match (&tx.from, &tx.sign) {
        (Some(from), Some(sign)) => {
            User::verify(from, &tx.signable_bytes(), sign).is_ok()
        }
        _ => false,
    };
    (hash_ok, sig_ok)
}
