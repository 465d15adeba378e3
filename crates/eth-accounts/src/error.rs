use eth_primitives::PrimitivesError;

/// Error taxonomy for account and wallet operations.
///
/// Every variant except `Generation` is local and recoverable by the caller
/// (supply the right passphrase, skip the missing account, and so on).
/// `Generation` means the randomness source failed, a condition that
/// invalidates every key the process could issue, so callers should treat it
/// as fatal rather than retry.
#[derive(Debug, thiserror::Error)]
pub enum AccountsError {
    #[error("key generation failed: {0}")]
    Generation(String),

    #[error("derivation failed: {0}")]
    Derivation(String),

    #[error("authentication needed: {0}")]
    Authentication(String),

    #[error("wallet already open")]
    AlreadyOpen,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Io(String),

    #[error("malformed input: {0}")]
    Encoding(String),
}

impl From<PrimitivesError> for AccountsError {
    fn from(e: PrimitivesError) -> Self {
        match e {
            PrimitivesError::EntropyExhausted(msg) => AccountsError::Generation(msg),
            PrimitivesError::InvalidDerivationPath(_)
            | PrimitivesError::InvalidChildIndex(_)
            | PrimitivesError::HardenedFromPublic
            | PrimitivesError::InvalidChildKey
            | PrimitivesError::InvalidSeed(_) => AccountsError::Derivation(e.to_string()),
            other => AccountsError::Encoding(other.to_string()),
        }
    }
}
