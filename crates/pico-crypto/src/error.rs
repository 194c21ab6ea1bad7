use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// GCM tag mismatch: wrong password or corrupted key material.
    #[error("authentication failed")]
    Auth,

    /// ECDSA verification failure.
    #[error("invalid digital signature")]
    Sig,

    /// Key or signature material that does not decode to the expected shape.
    #[error("malformed {0}")]
    Malformed(&'static str),
}
