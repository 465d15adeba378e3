//! Transaction boundary for signing.
//!
//! Field encoding (RLP or an equivalent) belongs to the transaction type, not
//! to this crate; wallets only need the canonical signing hash and a way to
//! attach the produced signature. Implementors supply both.

use eth_primitives::ec::RecoverableSignature;

use crate::AccountsError;

/// A transaction value a wallet can sign.
///
/// Implementors own their field encoding. The signing hash must cover every
/// encoded field except the signature itself and must fold `chain_id` into
/// the preimage when one is given, so a signature for one chain can never be
/// replayed on another.
pub trait SignableTransaction: Sized {
    /// The canonical 32-byte signing hash of this transaction.
    ///
    /// # Arguments
    /// * `chain_id` - Domain separator; `None` selects the pre-chain-id
    ///   legacy scheme.
    fn signing_hash(&self, chain_id: Option<u64>) -> [u8; 32];

    /// Return a copy of this transaction with the signature fields populated.
    ///
    /// The receiver is not modified. Fails with `Encoding` if the signature
    /// cannot be represented in the transaction's signature fields.
    fn with_signature(
        &self,
        signature: &RecoverableSignature,
        chain_id: Option<u64>,
    ) -> Result<Self, AccountsError>;
}
