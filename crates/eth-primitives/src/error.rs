/// Unified error type for all primitives operations.
///
/// Covers errors from key generation, EC operations, derivation, and encoding.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("entropy source exhausted: {0}")]
    EntropyExhausted(String),

    #[error("invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    #[error("invalid child index: {0}")]
    InvalidChildIndex(String),

    #[error("hardened derivation requires private material")]
    HardenedFromPublic,

    #[error("derived child key is invalid, use the next index")]
    InvalidChildKey,

    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    #[error("{0}")]
    Other(String),
}

impl From<hex::FromHexError> for PrimitivesError {
    fn from(e: hex::FromHexError) -> Self {
        PrimitivesError::InvalidHex(e.to_string())
    }
}
