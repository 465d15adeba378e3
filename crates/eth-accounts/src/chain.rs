//! Chain-state query boundary.
//!
//! The self-derivation loop needs exactly one fact about an address: has it
//! ever transacted. Implementors answer that from whatever chain state they
//! have (a node connection, an index, a fixture in tests).

use eth_primitives::address::Address;

use crate::AccountsError;

/// Read-only access to chain activity for account discovery.
///
/// Implementations may be slow (network or storage I/O); callers must never
/// invoke this while holding wallet or backend locks.
pub trait ChainStateReader: Send + Sync {
    /// Whether the address has a non-zero balance or transaction count.
    fn has_activity(&self, address: &Address) -> Result<bool, AccountsError>;
}
