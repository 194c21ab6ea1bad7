//! secp256k1 keypair primitives.
//!
//! Public keys travel as base-58 of the 64-byte uncompressed point (x ‖ y,
//! SEC1 prefix stripped); signatures as base-58 of the 64-byte raw (r ‖ s)
//! form. Signing operates on a SHA3-256 prehash of the message.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use pico_core::types::PubKey;

use crate::error::CryptoError;

/// Raw public-key length on the wire (x ‖ y, no SEC1 tag byte).
pub const PUB_LEN: usize = 64;

/// Raw signature length (r ‖ s).
pub const SIG_LEN: usize = 64;

/// Generate a fresh keypair; the public half is already wire-encoded.
pub fn generate() -> (SigningKey, PubKey) {
    let sk = SigningKey::random(&mut OsRng);
    let pk = encode_pub(sk.verifying_key());
    (sk, pk)
}

/// Base-58 of the uncompressed point without its `0x04` prefix.
pub fn encode_pub(vk: &VerifyingKey) -> PubKey {
    let point = vk.to_encoded_point(false);
    PubKey::new(bs58::encode(&point.as_bytes()[1..]).into_string())
}

pub fn decode_pub(pub_key: &PubKey) -> Result<VerifyingKey, CryptoError> {
    let raw = bs58::decode(pub_key.as_str())
        .into_vec()
        .map_err(|_| CryptoError::Malformed("public key"))?;
    if raw.len() != PUB_LEN {
        return Err(CryptoError::Malformed("public key"));
    }
    let mut sec1 = Vec::with_capacity(PUB_LEN + 1);
    sec1.push(0x04);
    sec1.extend_from_slice(&raw);
    VerifyingKey::from_sec1_bytes(&sec1).map_err(|_| CryptoError::Malformed("public key"))
}

/// Sign a 32-byte prehash; returns the base-58 raw signature.
pub fn sign_digest(sk: &SigningKey, digest: &[u8; 32]) -> Result<String, CryptoError> {
    let sig: Signature = sk.sign_prehash(digest).map_err(|_| CryptoError::Sig)?;
    Ok(bs58::encode(sig.to_bytes()).into_string())
}

/// Verify a base-58 raw signature over a 32-byte prehash.
pub fn verify_digest(
    pub_key: &PubKey,
    digest: &[u8; 32],
    sign: &str,
) -> Result<(), CryptoError> {
    let vk = decode_pub(pub_key)?;
    let raw = bs58::decode(sign)
        .into_vec()
        .map_err(|_| CryptoError::Malformed("signature"))?;
    if raw.len() != SIG_LEN {
        return Err(CryptoError::Malformed("signature"));
    }
    let sig = Signature::from_slice(&raw).map_err(|_| CryptoError::Malformed("signature"))?;
    vk.verify_prehash(digest, &sig).map_err(|_| CryptoError::Sig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pico_core::canonical::sha3_256;

    #[test]
    fn pub_key_encodes_to_64_bytes() {
        let (_, pk) = generate();
        let raw = bs58::decode(pk.as_str()).into_vec().unwrap();
        assert_eq!(raw.len(), PUB_LEN);
    }

    #[test]
    fn pub_key_round_trip() {
        let (sk, pk) = generate();
        let vk = decode_pub(&pk).unwrap();
        assert_eq!(&vk, sk.verifying_key());
    }

    #[test]
    fn sign_verify_round_trip() {
        let (sk, pk) = generate();
        let digest = sha3_256(b"pay 10 picocoins to bob");
        let sig = sign_digest(&sk, &digest).unwrap();
        assert!(verify_digest(&pk, &digest, &sig).is_ok());
    }

    #[test]
    fn wrong_digest_fails() {
        let (sk, pk) = generate();
        let sig = sign_digest(&sk, &sha3_256(b"original")).unwrap();
        assert!(matches!(
            verify_digest(&pk, &sha3_256(b"tampered"), &sig),
            Err(CryptoError::Sig)
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let (sk, _) = generate();
        let (_, other_pk) = generate();
        let digest = sha3_256(b"msg");
        let sig = sign_digest(&sk, &digest).unwrap();
        assert!(verify_digest(&other_pk, &digest, &sig).is_err());
    }

    #[test]
    fn garbage_material_is_malformed() {
        let digest = sha3_256(b"msg");
        assert!(matches!(
            verify_digest(&PubKey::new("not-base58-0OIl".into()), &digest, "AA"),
            Err(CryptoError::Malformed(_))
        ));
        let (_, pk) = generate();
        assert!(matches!(
            verify_digest(&pk, &digest, "AA"),
            Err(CryptoError::Malformed(_))
        ));
    }
}
