//! The polymorphic wallet and backend contracts.
//!
//! A wallet is a capability bundle over one or more accounts backed by a
//! single store or device; a backend aggregates the wallets of one provider
//! and notifies subscribers of arrivals and departures. The contract is
//! uniform across software keys, seed-derived hierarchies, and external
//! devices, which differ wildly in trust and latency; callers must treat
//! every open or signing call as potentially slow.

use std::sync::Arc;

use eth_primitives::bip32::DerivationPath;
use eth_primitives::ec::RecoverableSignature;

use crate::account::{Account, Url};
use crate::chain::ChainStateReader;
use crate::events::Subscription;
use crate::hashing::{hash_for_mimetype, text_hash};
use crate::transaction::SignableTransaction;
use crate::AccountsError;

/// The operations every wallet supports, regardless of what holds its keys.
///
/// Lifecycle: `open` moves the wallet from closed to open (failing with
/// `AlreadyOpen` on a second call), `close` releases all decrypted material
/// and is idempotent. Implementations that unlock key material per signing
/// call cycle locked/unlocked internally; callers only ever observe open or
/// closed.
pub trait Wallet: Send + Sync {
    /// The wallet's locator. Stable for the wallet's lifetime.
    fn url(&self) -> Url;

    /// A human-readable status string.
    ///
    /// Never fails: internal faults are folded into the returned text.
    fn status(&self) -> String;

    /// Establish a usable session.
    ///
    /// Variants that need no passphrase ignore it, but the call is still
    /// required for lifecycle uniformity. Fails with `Authentication` on a
    /// bad passphrase and `AlreadyOpen` if the wallet is already open.
    fn open(&self, passphrase: &str) -> Result<(), AccountsError>;

    /// Release decrypted key material and device handles.
    ///
    /// Idempotent: closing a closed wallet is a no-op. Signals the wallet's
    /// self-derivation loop, if any, to stop before its next step.
    fn close(&self) -> Result<(), AccountsError>;

    /// The currently tracked accounts.
    ///
    /// For hierarchical wallets this is not exhaustive: only explicitly
    /// derived or pinned accounts appear, since the derivation tree itself
    /// is unbounded.
    fn accounts(&self) -> Vec<Account>;

    /// Whether the exact (address, locator) pair belongs to this wallet.
    fn contains(&self, account: &Account) -> bool;

    /// Compute the account at `path`.
    ///
    /// With `pin` set, the account is added to the tracked set and persists
    /// across calls; without it the account is returned but not retained.
    fn derive(&self, path: &DerivationPath, pin: bool) -> Result<Account, AccountsError>;

    /// Configure and start background account discovery along `bases`.
    ///
    /// Returns immediately; the loop runs as its own task and commits
    /// discovered accounts into the tracked set. Wallets without a
    /// derivation hierarchy treat this as a no-op.
    fn self_derive(&self, bases: &[DerivationPath], chain: Arc<dyn ChainStateReader>);

    /// Sign a pre-computed 32-byte hash with the account's key.
    ///
    /// This is the primitive every other signing operation routes through.
    /// Fails with `NotFound` for an account this wallet does not own and
    /// `Authentication` when no session is established.
    fn sign_hash(
        &self,
        account: &Account,
        hash: &[u8; 32],
    ) -> Result<RecoverableSignature, AccountsError>;

    /// Sign a pre-computed hash using a one-shot unlock with `passphrase`.
    ///
    /// Bypasses any cached session: the key is unlocked, used, and released
    /// within this call, trading speed for a minimal decrypted-key lifetime.
    fn sign_hash_with_passphrase(
        &self,
        account: &Account,
        passphrase: &str,
        hash: &[u8; 32],
    ) -> Result<RecoverableSignature, AccountsError>;

    /// Sign data hashed under the scheme declared by `mimetype`.
    fn sign_data(
        &self,
        account: &Account,
        mimetype: &str,
        data: &[u8],
    ) -> Result<RecoverableSignature, AccountsError> {
        let hash = hash_for_mimetype(mimetype, data)?;
        self.sign_hash(account, &hash)
    }

    /// Passphrase variant of [`Wallet::sign_data`].
    fn sign_data_with_passphrase(
        &self,
        account: &Account,
        passphrase: &str,
        mimetype: &str,
        data: &[u8],
    ) -> Result<RecoverableSignature, AccountsError> {
        let hash = hash_for_mimetype(mimetype, data)?;
        self.sign_hash_with_passphrase(account, passphrase, &hash)
    }

    /// Sign a personal message under the text/plain prefix scheme.
    ///
    /// The signature's recovery byte is 0 or 1, not the chain-adjusted form.
    fn sign_text(
        &self,
        account: &Account,
        text: &[u8],
    ) -> Result<RecoverableSignature, AccountsError> {
        self.sign_hash(account, &text_hash(text))
    }

    /// Passphrase variant of [`Wallet::sign_text`].
    fn sign_text_with_passphrase(
        &self,
        account: &Account,
        passphrase: &str,
        text: &[u8],
    ) -> Result<RecoverableSignature, AccountsError> {
        self.sign_hash_with_passphrase(account, passphrase, &text_hash(text))
    }
}

/// Sign a transaction, returning a new value with signature fields populated.
///
/// The original transaction is left unmodified. `chain_id` domain-separates
/// the signing hash to prevent cross-chain replay.
pub fn sign_tx<T: SignableTransaction>(
    wallet: &dyn Wallet,
    account: &Account,
    tx: &T,
    chain_id: Option<u64>,
) -> Result<T, AccountsError> {
    let hash = tx.signing_hash(chain_id);
    let signature = wallet.sign_hash(account, &hash)?;
    tx.with_signature(&signature, chain_id)
}

/// Passphrase variant of [`sign_tx`]: one-shot unlock-sign-relock.
pub fn sign_tx_with_passphrase<T: SignableTransaction>(
    wallet: &dyn Wallet,
    account: &Account,
    passphrase: &str,
    tx: &T,
    chain_id: Option<u64>,
) -> Result<T, AccountsError> {
    let hash = tx.signing_hash(chain_id);
    let signature = wallet.sign_hash_with_passphrase(account, passphrase, &hash)?;
    tx.with_signature(&signature, chain_id)
}

/// A wallet provider: owns a set of wallets and reports their comings and
/// goings.
pub trait Backend: Send + Sync {
    /// A stable snapshot of the wallets this backend is currently tracking,
    /// ordered by locator.
    fn wallets(&self) -> Vec<Arc<dyn Wallet>>;

    /// Subscribe to wallet lifecycle events from this backend.
    ///
    /// Dropping the returned handle stops delivery to that subscriber
    /// without affecting others.
    fn subscribe(&self) -> Subscription;
}
