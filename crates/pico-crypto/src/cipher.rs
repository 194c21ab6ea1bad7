//! At-rest encryption of the private scalar.
//!
//! AES-256-GCM keyed by SHA3-256 of the password, with a random 16-byte
//! nonce. The persisted form is `nonce(16) ‖ ciphertext(32) ‖ tag(16)`,
//! base-58 encoded by the caller.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Key, Nonce};
use rand::RngCore;
use zeroize::Zeroizing;

use pico_core::canonical::sha3_256;

use crate::error::CryptoError;

/// AES-256-GCM with the 16-byte nonce the key format mandates.
type PrivCipher = AesGcm<Aes256, U16>;

pub const NONCE_LEN: usize = 16;
pub const TAG_LEN: usize = 16;

fn cipher_for(password: &str) -> PrivCipher {
    let key = Zeroizing::new(sha3_256(password.as_bytes()));
    PrivCipher::new(Key::<PrivCipher>::from_slice(key.as_ref()))
}

/// Encrypt the 32-byte private scalar; returns `nonce ‖ ciphertext ‖ tag`.
pub fn encrypt_priv(scalar: &[u8], password: &str) -> Vec<u8> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let sealed = cipher_for(password)
        .encrypt(Nonce::<U16>::from_slice(&nonce), scalar)
        .expect("AES-GCM encryption is infallible for in-memory buffers");

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    out
}

/// Decrypt `nonce ‖ ciphertext ‖ tag`; the scalar comes back in a zeroizing
/// buffer. A GCM tag mismatch is an authentication failure.
pub fn decrypt_priv(blob: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Malformed("encrypted key"));
    }
    let (nonce, sealed) = blob.split_at(NONCE_LEN);
    cipher_for(password)
        .decrypt(Nonce::<U16>::from_slice(nonce), sealed)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::Auth)
}
