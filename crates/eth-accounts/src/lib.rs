/// Ethereum SDK - Account and wallet management.
///
/// Provides the account/wallet abstraction over heterogeneous key holders:
/// - Accounts, wallet locators, and the signing mimetype constants
/// - The polymorphic `Wallet` trait and `Backend` wallet providers
/// - Key generation and the `KeyStore` persistence boundary
/// - Seed-backed HD wallets with gap-limited background account discovery
/// - Device-backed wallets over an external transport boundary
/// - Wallet lifecycle events on a bounded, non-blocking bus

pub mod account;
pub mod hashing;
pub mod transaction;
pub mod chain;
pub mod registry;
pub mod events;
pub mod wallet;
pub mod keystore;
pub mod hd;
pub mod device;

mod selfderive;

mod error;
pub use error::AccountsError;

pub use account::{Account, Url};
pub use chain::ChainStateReader;
pub use device::{Device, DeviceHub, DeviceWallet};
pub use events::{EventBus, Subscription, WalletEvent, WalletEventKind};
pub use hd::{HdBackend, HdWallet, SelfDerivePolicy};
pub use keystore::{generate_key, Key, KeyStore, KeyStoreBackend, KeyWallet, MemoryKeyStore};
pub use transaction::SignableTransaction;
pub use wallet::{sign_tx, sign_tx_with_passphrase, Backend, Wallet};
