//! Stored keys, the key-storage boundary, and single-key wallets.
//!
//! A stored key couples a random 128-bit identifier with an address and the
//! secret scalar. The encrypted container format lives behind the `KeyStore`
//! trait; this module supplies an in-process implementation good enough for
//! embedding and tests, plus the wallet and backend types over stored keys.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;
use zeroize::{Zeroize, Zeroizing};

use eth_primitives::address::Address;
use eth_primitives::bip32::DerivationPath;
use eth_primitives::ec::{PrivateKey, RecoverableSignature};
use eth_primitives::hash::{sha256_hmac, sha512_hmac};

use crate::account::{Account, Url};
use crate::chain::ChainStateReader;
use crate::events::{EventBus, Subscription, WalletEventKind, DEFAULT_EVENT_CAPACITY};
use crate::registry::{AccountCache, AddOutcome};
use crate::wallet::{Backend, Wallet};
use crate::AccountsError;

/// Locator scheme for wallets backed by stored key files.
pub const KEYSTORE_SCHEME: &str = "keystore";

/// A private key as held by the keystore: identifier, address, secret.
///
/// The identifier is random and carries no relationship to the address. The
/// wrapped private key zeroizes itself when the `Key` is dropped, so a `Key`
/// should live no longer than the operation that needed it.
pub struct Key {
    /// Random 128-bit identifier, assigned at generation and stable for the
    /// key's stored lifetime. Never reused, never derived from the address.
    pub id: Uuid,
    /// The address derived from the key.
    pub address: Address,
    private_key: PrivateKey,
}

impl Key {
    /// Wrap an existing private key with a fresh identifier.
    pub fn new(private_key: PrivateKey) -> Self {
        Key {
            id: Uuid::new_v4(),
            address: private_key.address(),
            private_key,
        }
    }

    /// Reassemble a stored key, keeping its original identifier.
    pub fn with_id(id: Uuid, private_key: PrivateKey) -> Self {
        Key {
            id,
            address: private_key.address(),
            private_key,
        }
    }

    /// The secret key. Borrow only for the duration of one operation.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key")
            .field("id", &self.id)
            .field("address", &self.address)
            .finish()
    }
}

/// Generate a new key from the supplied randomness source.
///
/// Draws a uniformly random secp256k1 scalar from `rng` and assigns a fresh
/// random identifier. An exhausted or broken source yields `Generation`,
/// which callers treat as process-fatal: a compromised source invalidates
/// every key ever issued.
pub fn generate_key(rng: &mut dyn RngCore) -> Result<Key, AccountsError> {
    let private_key = PrivateKey::generate(rng)?;
    Ok(Key::new(private_key))
}

/// Canonical file name for a stored key: creation time plus address.
pub fn key_file_name(address: &Address) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("UTC--{}--{}", timestamp, hex::encode(address.as_bytes()))
}

/// Persistent storage for keys, encrypted under a passphrase.
///
/// The concrete cipher, KDF, and container layout belong to the
/// implementation. Two guarantees are required of every implementor: storing
/// the same key under different passphrases yields non-interchangeable
/// containers, and a wrong passphrase is detected: `load` fails closed and
/// never hands back wrong key material.
pub trait KeyStore: Send + Sync {
    /// Encrypt and persist `key` at `path` under `passphrase`.
    fn store(&self, path: &str, key: &Key, passphrase: &str) -> Result<(), AccountsError>;

    /// Decrypt and return the key at `path`.
    ///
    /// Fails with `Authentication` on a wrong passphrase or a failed
    /// integrity check, and `NotFound` for an unknown path.
    fn load(&self, path: &str, passphrase: &str) -> Result<Key, AccountsError>;

    /// Remove the container at `path`.
    fn remove(&self, path: &str) -> Result<(), AccountsError>;

    /// Resolve a bare file name into a full storage path.
    fn join_path(&self, filename: &str) -> String;

    /// Enumerate the stored containers as (path, address) pairs.
    fn list(&self) -> Result<Vec<(String, Address)>, AccountsError>;
}

/// A passphrase-sealed secret.
///
/// Stand-in for the external encrypted container format: the payload is
/// masked with an HMAC-derived keystream and bound to the passphrase by a
/// MAC, so different passphrases produce non-interchangeable blobs and a
/// wrong passphrase is always detected. It is not a vetted container format
/// and is not meant to leave the process.
#[derive(Clone)]
pub struct SealedBlob {
    salt: [u8; 32],
    ciphertext: Vec<u8>,
    mac: [u8; 32],
}

impl SealedBlob {
    /// Seal `secret` under `passphrase`.
    pub fn seal(secret: &[u8], passphrase: &str) -> Self {
        let mut salt = [0u8; 32];
        OsRng.fill_bytes(&mut salt);
        let keys = sha512_hmac(passphrase.as_bytes(), &salt);

        let mut ciphertext = secret.to_vec();
        apply_keystream(&keys[..32], &salt, &mut ciphertext);
        let mac = sha256_hmac(&keys[32..], &ciphertext);

        SealedBlob {
            salt,
            ciphertext,
            mac,
        }
    }

    /// Open the blob, verifying the passphrase binding first.
    ///
    /// # Returns
    /// The secret in a zeroizing buffer, or `Authentication` when the MAC
    /// does not verify (wrong passphrase or corrupted container).
    pub fn open(&self, passphrase: &str) -> Result<Zeroizing<Vec<u8>>, AccountsError> {
        let keys = sha512_hmac(passphrase.as_bytes(), &self.salt);
        let mac = sha256_hmac(&keys[32..], &self.ciphertext);
        if mac != self.mac {
            return Err(AccountsError::Authentication(
                "could not decrypt key with given passphrase".to_string(),
            ));
        }
        let mut secret = Zeroizing::new(self.ciphertext.clone());
        apply_keystream(&keys[..32], &self.salt, &mut secret);
        Ok(secret)
    }
}

/// XOR `data` with an HMAC-derived keystream in 32-byte counter blocks.
fn apply_keystream(key: &[u8], salt: &[u8; 32], data: &mut [u8]) {
    for (block_index, block) in data.chunks_mut(32).enumerate() {
        let mut input = [0u8; 40];
        input[..32].copy_from_slice(salt);
        input[32..].copy_from_slice(&(block_index as u64).to_be_bytes());
        let mut stream = sha256_hmac(key, &input);
        for (byte, mask) in block.iter_mut().zip(stream.iter()) {
            *byte ^= mask;
        }
        stream.zeroize();
    }
}

/// In-process key storage.
///
/// Containers live in a guarded map keyed by path. Useful for embedding and
/// tests; durable storage is expected to come from an external implementor
/// of [`KeyStore`].
pub struct MemoryKeyStore {
    root: String,
    entries: RwLock<BTreeMap<String, SealedEntry>>,
}

struct SealedEntry {
    id: Uuid,
    address: Address,
    blob: SealedBlob,
}

impl MemoryKeyStore {
    /// Create a store rooted at the given virtual directory.
    pub fn new(root: &str) -> Self {
        MemoryKeyStore {
            root: root.trim_end_matches('/').to_string(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn store(&self, path: &str, key: &Key, passphrase: &str) -> Result<(), AccountsError> {
        let mut scalar = key.private_key().to_bytes();
        let blob = SealedBlob::seal(&scalar, passphrase);
        scalar.zeroize();

        let mut entries = self.entries.write().unwrap();
        entries.insert(
            path.to_string(),
            SealedEntry {
                id: key.id,
                address: key.address,
                blob,
            },
        );
        Ok(())
    }

    fn load(&self, path: &str, passphrase: &str) -> Result<Key, AccountsError> {
        let entries = self.entries.read().unwrap();
        let entry = entries
            .get(path)
            .ok_or_else(|| AccountsError::NotFound(format!("no key at {}", path)))?;

        let secret = entry.blob.open(passphrase)?;
        let private_key = PrivateKey::from_bytes(&secret)?;
        let key = Key::with_id(entry.id, private_key);
        // Fail closed if the container's address no longer matches its key.
        if key.address != entry.address {
            return Err(AccountsError::Authentication(
                "key content does not match stored address".to_string(),
            ));
        }
        Ok(key)
    }

    fn remove(&self, path: &str) -> Result<(), AccountsError> {
        let mut entries = self.entries.write().unwrap();
        entries
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| AccountsError::NotFound(format!("no key at {}", path)))
    }

    fn join_path(&self, filename: &str) -> String {
        format!("{}/{}", self.root, filename)
    }

    fn list(&self) -> Result<Vec<(String, Address)>, AccountsError> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .map(|(path, entry)| (path.clone(), entry.address))
            .collect())
    }
}

/// A wallet over a single stored key.
///
/// `open` decrypts the key and holds it for the session; `close` drops it.
/// The passphrase signing variants never touch the session: they unlock,
/// sign, and release within the call.
pub struct KeyWallet {
    account: Account,
    store: Arc<dyn KeyStore>,
    unlocked: RwLock<Option<Key>>,
    bus: EventBus,
}

impl KeyWallet {
    /// Build a wallet for one stored account.
    pub fn new(account: Account, store: Arc<dyn KeyStore>, bus: EventBus) -> Self {
        KeyWallet {
            account,
            store,
            unlocked: RwLock::new(None),
            bus,
        }
    }

    fn check_account(&self, account: &Account) -> Result<(), AccountsError> {
        if *account != self.account {
            return Err(AccountsError::NotFound(format!(
                "unknown account {}",
                account.address
            )));
        }
        Ok(())
    }
}

impl Wallet for KeyWallet {
    fn url(&self) -> Url {
        self.account.url.clone()
    }

    fn status(&self) -> String {
        if self.unlocked.read().unwrap().is_some() {
            "Unlocked".to_string()
        } else {
            "Locked".to_string()
        }
    }

    fn open(&self, passphrase: &str) -> Result<(), AccountsError> {
        let mut unlocked = self.unlocked.write().unwrap();
        if unlocked.is_some() {
            return Err(AccountsError::AlreadyOpen);
        }
        let key = self.store.load(&self.account.url.path, passphrase)?;
        if key.address != self.account.address {
            return Err(AccountsError::Authentication(
                "stored key does not match account address".to_string(),
            ));
        }
        *unlocked = Some(key);
        drop(unlocked);
        self.bus.publish(self.url(), WalletEventKind::Opened);
        Ok(())
    }

    fn close(&self) -> Result<(), AccountsError> {
        // Dropping the key zeroizes its scalar.
        self.unlocked.write().unwrap().take();
        Ok(())
    }

    fn accounts(&self) -> Vec<Account> {
        vec![self.account.clone()]
    }

    fn contains(&self, account: &Account) -> bool {
        *account == self.account
    }

    fn derive(&self, _path: &DerivationPath, _pin: bool) -> Result<Account, AccountsError> {
        Err(AccountsError::Derivation(
            "single-key wallets do not support derivation".to_string(),
        ))
    }

    fn self_derive(&self, _bases: &[DerivationPath], _chain: Arc<dyn ChainStateReader>) {
        // One fixed key, nothing to discover.
    }

    fn sign_hash(
        &self,
        account: &Account,
        hash: &[u8; 32],
    ) -> Result<RecoverableSignature, AccountsError> {
        self.check_account(account)?;
        let unlocked = self.unlocked.read().unwrap();
        match unlocked.as_ref() {
            Some(key) => Ok(key.private_key().sign_hash(hash)?),
            None => Err(AccountsError::Authentication(
                "wallet locked, open it or use the passphrase variant".to_string(),
            )),
        }
    }

    fn sign_hash_with_passphrase(
        &self,
        account: &Account,
        passphrase: &str,
        hash: &[u8; 32],
    ) -> Result<RecoverableSignature, AccountsError> {
        self.check_account(account)?;
        // One-shot unlock; the key drops (and zeroizes) at the end of this
        // call on every path.
        let key = self.store.load(&self.account.url.path, passphrase)?;
        Ok(key.private_key().sign_hash(hash)?)
    }
}

/// Backend over the key files of one store.
///
/// Maintains the locator/address registry so lookups avoid storage scans,
/// and publishes an `Arrived`/`Dropped` event for every account added to or
/// removed from the store through this backend.
pub struct KeyStoreBackend {
    store: Arc<dyn KeyStore>,
    wallets: RwLock<BTreeMap<Url, Arc<KeyWallet>>>,
    cache: AccountCache,
    bus: EventBus,
}

impl KeyStoreBackend {
    /// Build a backend over `store`, indexing its existing keys.
    pub fn new(store: Arc<dyn KeyStore>) -> Result<Self, AccountsError> {
        Self::with_event_capacity(store, DEFAULT_EVENT_CAPACITY)
    }

    /// Like [`KeyStoreBackend::new`] with an explicit event-bus capacity.
    pub fn with_event_capacity(
        store: Arc<dyn KeyStore>,
        capacity: usize,
    ) -> Result<Self, AccountsError> {
        let backend = KeyStoreBackend {
            store: store.clone(),
            wallets: RwLock::new(BTreeMap::new()),
            cache: AccountCache::new(),
            bus: EventBus::with_capacity(capacity),
        };
        for (path, address) in store.list()? {
            let account = Account::new(address, Url::new(KEYSTORE_SCHEME, &path));
            backend.insert_wallet(account)?;
        }
        Ok(backend)
    }

    fn insert_wallet(&self, account: Account) -> Result<Arc<KeyWallet>, AccountsError> {
        match self.cache.add(account.clone()) {
            AddOutcome::Inserted | AddOutcome::AlreadyTracked => {}
            AddOutcome::AddressCollision => {
                return Err(AccountsError::Io(format!(
                    "address {} already tracked under a different locator",
                    account.address
                )))
            }
        }
        let wallet = Arc::new(KeyWallet::new(
            account.clone(),
            self.store.clone(),
            self.bus.clone(),
        ));
        self.wallets
            .write()
            .unwrap()
            .insert(account.url, wallet.clone());
        Ok(wallet)
    }

    /// Generate a key, store it under `passphrase`, and start tracking it.
    ///
    /// The new account is visible in [`KeyStoreBackend::accounts`] before
    /// this returns, and an `Arrived` event is published. The decrypted key
    /// exists only inside this call; if storing fails the key is dropped and
    /// zeroized before the error propagates.
    pub fn new_account(
        &self,
        rng: &mut dyn RngCore,
        passphrase: &str,
    ) -> Result<Account, AccountsError> {
        let key = generate_key(rng)?;
        let path = self.store.join_path(&key_file_name(&key.address));
        self.store.store(&path, &key, passphrase)?;
        let account = Account::new(key.address, Url::new(KEYSTORE_SCHEME, &path));
        drop(key);

        self.insert_wallet(account.clone())?;
        self.bus
            .publish(account.url.clone(), WalletEventKind::Arrived);
        Ok(account)
    }

    /// Remove an account's container from the store and stop tracking it.
    ///
    /// The passphrase is verified against the container first, so a typo
    /// cannot destroy a key. Publishes a `Dropped` event on success.
    pub fn delete_account(
        &self,
        account: &Account,
        passphrase: &str,
    ) -> Result<(), AccountsError> {
        if !self.cache.contains(account) {
            return Err(AccountsError::NotFound(format!(
                "unknown account {}",
                account.address
            )));
        }
        // Decrypt-check before destroying anything; the loaded key drops
        // (and zeroizes) immediately.
        self.store.load(&account.url.path, passphrase)?;
        self.store.remove(&account.url.path)?;

        if let Some(wallet) = self.wallets.write().unwrap().remove(&account.url) {
            let _ = wallet.close();
        }
        self.cache.remove(&account.url);
        self.bus
            .publish(account.url.clone(), WalletEventKind::Dropped);
        Ok(())
    }

    /// Snapshot of all tracked accounts, ordered by locator.
    pub fn accounts(&self) -> Vec<Account> {
        self.cache.accounts()
    }

    /// Whether the backend tracks the exact (address, locator) pair.
    pub fn has_account(&self, account: &Account) -> bool {
        self.cache.contains(account)
    }

    /// The wallet owning `account`.
    pub fn wallet_for(&self, account: &Account) -> Result<Arc<KeyWallet>, AccountsError> {
        self.wallets
            .read()
            .unwrap()
            .get(&account.url)
            .cloned()
            .ok_or_else(|| AccountsError::NotFound(format!("unknown wallet {}", account.url)))
    }
}

impl Backend for KeyStoreBackend {
    fn wallets(&self) -> Vec<Arc<dyn Wallet>> {
        self.wallets
            .read()
            .unwrap()
            .values()
            .map(|w| w.clone() as Arc<dyn Wallet>)
            .collect()
    }

    fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SubscriptionError;
    use crate::hashing::text_hash;

    fn store() -> Arc<MemoryKeyStore> {
        Arc::new(MemoryKeyStore::new("/keys"))
    }

    #[test]
    fn test_sealed_blob_round_trip() {
        let blob = SealedBlob::seal(b"thirty-two bytes of seed material", "hunter2");
        let secret = blob.open("hunter2").unwrap();
        assert_eq!(&secret[..], b"thirty-two bytes of seed material");
    }

    #[test]
    fn test_sealed_blob_wrong_passphrase_fails_closed() {
        let blob = SealedBlob::seal(b"secret", "right");
        let err = blob.open("wrong").unwrap_err();
        assert!(matches!(err, AccountsError::Authentication(_)));
    }

    #[test]
    fn test_sealed_blob_passphrases_not_interchangeable() {
        // Same secret, two passphrases: neither blob opens under the other.
        let a = SealedBlob::seal(b"secret", "alpha");
        let b = SealedBlob::seal(b"secret", "beta");
        assert!(a.open("beta").is_err());
        assert!(b.open("alpha").is_err());
    }

    #[test]
    fn test_generate_key_assigns_fresh_ids() {
        let key_a = generate_key(&mut OsRng).unwrap();
        let key_b = generate_key(&mut OsRng).unwrap();
        assert_ne!(key_a.id, key_b.id);
        assert_ne!(key_a.address, key_b.address);
    }

    #[test]
    fn test_store_load_preserves_identity() {
        let store = store();
        let key = generate_key(&mut OsRng).unwrap();
        let path = store.join_path(&key_file_name(&key.address));

        store.store(&path, &key, "pass").unwrap();
        let loaded = store.load(&path, "pass").unwrap();
        assert_eq!(loaded.id, key.id);
        assert_eq!(loaded.address, key.address);
        assert_eq!(
            loaded.private_key().to_bytes(),
            key.private_key().to_bytes()
        );
    }

    #[test]
    fn test_load_unknown_path() {
        let err = store().load("/keys/absent", "pass").unwrap_err();
        assert!(matches!(err, AccountsError::NotFound(_)));
    }

    #[test]
    fn test_key_wallet_lifecycle() {
        let store = store();
        let backend = KeyStoreBackend::new(store).unwrap();
        let account = backend.new_account(&mut OsRng, "correct").unwrap();
        let wallet = backend.wallet_for(&account).unwrap();

        assert_eq!(wallet.status(), "Locked");

        // Signing while locked needs authentication.
        let hash = text_hash(b"message");
        let err = wallet.sign_hash(&account, &hash).unwrap_err();
        assert!(matches!(err, AccountsError::Authentication(_)));

        wallet.open("correct").unwrap();
        assert_eq!(wallet.status(), "Unlocked");
        assert!(matches!(
            wallet.open("correct").unwrap_err(),
            AccountsError::AlreadyOpen
        ));

        let sig = wallet.sign_hash(&account, &hash).unwrap();
        assert_eq!(sig.recover_address(&hash).unwrap(), account.address);

        wallet.close().unwrap();
        wallet.close().unwrap(); // idempotent
        assert_eq!(wallet.status(), "Locked");
    }

    #[test]
    fn test_reopen_with_wrong_passphrase_leaves_wallet_locked() {
        let store = store();
        let backend = KeyStoreBackend::new(store).unwrap();
        let account = backend.new_account(&mut OsRng, "correct").unwrap();
        let wallet = backend.wallet_for(&account).unwrap();

        wallet.open("correct").unwrap();
        wallet.close().unwrap();

        let err = wallet.open("incorrect").unwrap_err();
        assert!(matches!(err, AccountsError::Authentication(_)));
        // No decrypted material is resident.
        assert_eq!(wallet.status(), "Locked");
        assert!(wallet
            .sign_hash(&account, &text_hash(b"m"))
            .is_err());
    }

    #[test]
    fn test_passphrase_signing_bypasses_session() {
        let store = store();
        let backend = KeyStoreBackend::new(store).unwrap();
        let account = backend.new_account(&mut OsRng, "pass").unwrap();
        let wallet = backend.wallet_for(&account).unwrap();

        let hash = text_hash(b"one shot");
        let sig = wallet
            .sign_hash_with_passphrase(&account, "pass", &hash)
            .unwrap();
        assert_eq!(sig.recover_address(&hash).unwrap(), account.address);
        // The one-shot unlock left no session behind.
        assert_eq!(wallet.status(), "Locked");

        assert!(wallet
            .sign_hash_with_passphrase(&account, "wrong", &hash)
            .is_err());
    }

    #[test]
    fn test_sign_text_recovers_account_address() {
        let store = store();
        let backend = KeyStoreBackend::new(store).unwrap();
        let account = backend.new_account(&mut OsRng, "pass").unwrap();
        let wallet = backend.wallet_for(&account).unwrap();
        wallet.open("pass").unwrap();

        let sig = wallet.sign_text(&account, b"hello").unwrap();
        assert_eq!(
            sig.recover_address(&text_hash(b"hello")).unwrap(),
            account.address
        );
    }

    #[test]
    fn test_new_account_is_immediately_visible() {
        let store = store();
        let backend = KeyStoreBackend::new(store).unwrap();
        let account = backend.new_account(&mut OsRng, "pass").unwrap();

        // Read-your-writes: no stale-cache window.
        assert!(backend.accounts().contains(&account));
        assert!(backend.has_account(&account));
        assert_eq!(backend.wallets().len(), 1);
    }

    #[test]
    fn test_backend_reindexes_existing_store() {
        let store = store();
        let first = KeyStoreBackend::new(store.clone()).unwrap();
        let account = first.new_account(&mut OsRng, "pass").unwrap();
        drop(first);

        let second = KeyStoreBackend::new(store).unwrap();
        assert!(second.accounts().contains(&account));
    }

    #[test]
    fn test_lifecycle_events() {
        let store = store();
        let backend = KeyStoreBackend::new(store).unwrap();
        let mut sub = backend.subscribe();

        let account = backend.new_account(&mut OsRng, "pass").unwrap();
        let event = sub.try_recv().unwrap();
        assert_eq!(event.kind, WalletEventKind::Arrived);
        assert_eq!(event.url, account.url);

        let wallet = backend.wallet_for(&account).unwrap();
        wallet.open("pass").unwrap();
        assert_eq!(sub.try_recv().unwrap().kind, WalletEventKind::Opened);

        backend.delete_account(&account, "pass").unwrap();
        assert_eq!(sub.try_recv().unwrap().kind, WalletEventKind::Dropped);
        assert_eq!(sub.try_recv(), Err(SubscriptionError::Empty));
        assert!(backend.accounts().is_empty());
    }

    #[test]
    fn test_delete_account_verifies_passphrase() {
        let store = store();
        let backend = KeyStoreBackend::new(store).unwrap();
        let account = backend.new_account(&mut OsRng, "pass").unwrap();

        let err = backend.delete_account(&account, "typo").unwrap_err();
        assert!(matches!(err, AccountsError::Authentication(_)));
        assert!(backend.has_account(&account));
    }

    #[test]
    fn test_key_wallet_rejects_foreign_account() {
        let store = store();
        let backend = KeyStoreBackend::new(store).unwrap();
        let account = backend.new_account(&mut OsRng, "pass").unwrap();
        let other = backend.new_account(&mut OsRng, "pass").unwrap();
        let wallet = backend.wallet_for(&account).unwrap();
        wallet.open("pass").unwrap();

        assert!(!wallet.contains(&other));
        let err = wallet
            .sign_hash(&other, &text_hash(b"m"))
            .unwrap_err();
        assert!(matches!(err, AccountsError::NotFound(_)));
    }
}
