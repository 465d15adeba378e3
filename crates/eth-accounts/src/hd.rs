//! Seed-backed hierarchical deterministic wallets.
//!
//! An HD wallet holds a passphrase-sealed seed. While open, it derives
//! accounts on demand along derivation paths; the tracked set contains only
//! accounts explicitly derived with pinning or discovered by the background
//! self-derivation scanner, never the whole (unbounded) tree. Signing
//! re-derives the key at the account's recorded path and releases it before
//! returning, so decrypted material exists only inside the signing call.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use eth_primitives::address::Address;
use eth_primitives::bip32::{DerivationPath, ExtendedPrivateKey};
use eth_primitives::ec::RecoverableSignature;

use crate::account::{Account, Url};
use crate::chain::ChainStateReader;
use crate::events::{EventBus, Subscription, WalletEventKind, DEFAULT_EVENT_CAPACITY};
use crate::keystore::SealedBlob;
use crate::selfderive::{DerivationSource, PathTracker, SelfDeriver};
use crate::wallet::{Backend, Wallet};
use crate::AccountsError;

/// Locator scheme for seed-backed hierarchical wallets.
pub const HD_SCHEME: &str = "hd";

/// Tuning for background account discovery.
///
/// The gap limit is the number of consecutive unused indices probed before a
/// base path stops extending. 20 is the conventional recovery default; it is
/// a policy knob, not a protocol constant.
#[derive(Clone, Copy, Debug)]
pub struct SelfDerivePolicy {
    gap_limit: u32,
}

impl SelfDerivePolicy {
    /// Override the gap limit.
    pub fn with_gap_limit(mut self, gap_limit: u32) -> Self {
        self.gap_limit = gap_limit.max(1);
        self
    }

    /// The configured gap limit.
    pub fn gap_limit(&self) -> u32 {
        self.gap_limit
    }
}

impl Default for SelfDerivePolicy {
    fn default() -> Self {
        SelfDerivePolicy { gap_limit: 20 }
    }
}

struct HdState {
    url: Url,
    sealed: SealedBlob,
    policy: SelfDerivePolicy,
    session: RwLock<Option<ExtendedPrivateKey>>,
    tracked: PathTracker,
    scanner: Mutex<Option<SelfDeriver>>,
    bus: EventBus,
}

impl HdState {
    /// Locator for the account at `path` within this wallet.
    fn account_url(&self, path: &DerivationPath) -> Url {
        Url::new(HD_SCHEME, &format!("{}/{}", self.url.path, path))
    }

    /// Derive the address at `path`, taking only a brief shared lock on the
    /// session.
    fn derive_address(&self, path: &DerivationPath) -> Result<Address, AccountsError> {
        let session = self.session.read().unwrap();
        let master = session.as_ref().ok_or_else(|| {
            AccountsError::Authentication("wallet closed, open it first".to_string())
        })?;
        // The derived node (and its key) drops before this returns.
        let node = master.derive_path(path)?;
        Ok(node.address())
    }
}

impl DerivationSource for HdState {
    fn derive_candidate(&self, path: &DerivationPath) -> Result<Address, AccountsError> {
        self.derive_address(path)
    }

    fn pin(&self, path: &DerivationPath, address: Address) {
        let account = Account::new(address, self.account_url(path));
        self.tracked.pin(account, path.clone());
    }

    fn cursor(&self, base: &DerivationPath) -> u32 {
        self.tracked.cursor(base)
    }

    fn store_cursor(&self, base: &DerivationPath, next: u32) {
        self.tracked.store_cursor(base, next);
    }
}

/// A wallet deriving its accounts from one sealed seed.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct HdWallet {
    state: Arc<HdState>,
}

impl HdWallet {
    /// Build a wallet over a sealed seed, with the default discovery policy.
    pub fn new(name: &str, sealed: SealedBlob) -> Self {
        Self::with_policy(name, sealed, SelfDerivePolicy::default())
    }

    /// Build a wallet with an explicit discovery policy.
    pub fn with_policy(name: &str, sealed: SealedBlob, policy: SelfDerivePolicy) -> Self {
        Self::with_bus(name, sealed, policy, EventBus::new())
    }

    pub(crate) fn with_bus(
        name: &str,
        sealed: SealedBlob,
        policy: SelfDerivePolicy,
        bus: EventBus,
    ) -> Self {
        HdWallet {
            state: Arc::new(HdState {
                url: Url::new(HD_SCHEME, name),
                sealed,
                policy,
                session: RwLock::new(None),
                tracked: PathTracker::new(),
                scanner: Mutex::new(None),
                bus,
            }),
        }
    }

    /// The derivation path recorded for a tracked address, if any.
    pub fn path_of(&self, address: &Address) -> Option<DerivationPath> {
        self.state.tracked.path_of(address)
    }

    fn tracked_path(&self, account: &Account) -> Result<DerivationPath, AccountsError> {
        if !self.contains(account) {
            return Err(AccountsError::NotFound(format!(
                "unknown account {}",
                account.address
            )));
        }
        self.path_of(&account.address).ok_or_else(|| {
            AccountsError::NotFound(format!("no derivation path for {}", account.address))
        })
    }
}

impl Wallet for HdWallet {
    fn url(&self) -> Url {
        self.state.url.clone()
    }

    fn status(&self) -> String {
        if self.state.session.read().unwrap().is_some() {
            format!("Open, {} account(s) tracked", self.state.tracked.count())
        } else {
            "Closed".to_string()
        }
    }

    fn open(&self, passphrase: &str) -> Result<(), AccountsError> {
        let mut session = self.state.session.write().unwrap();
        if session.is_some() {
            return Err(AccountsError::AlreadyOpen);
        }
        let seed = self.state.sealed.open(passphrase)?;
        let master = ExtendedPrivateKey::new_master(&seed)?;
        *session = Some(master);
        drop(session);
        self.state.bus.publish(self.url(), WalletEventKind::Opened);
        Ok(())
    }

    fn close(&self) -> Result<(), AccountsError> {
        // Stop discovery before releasing the master key, so the scanner
        // never observes a half-open wallet.
        if let Some(scanner) = self.state.scanner.lock().unwrap().take() {
            scanner.signal_stop();
        }
        // Dropping the extended key zeroizes key and chain code.
        self.state.session.write().unwrap().take();
        Ok(())
    }

    fn accounts(&self) -> Vec<Account> {
        self.state.tracked.accounts()
    }

    fn contains(&self, account: &Account) -> bool {
        self.state.tracked.contains(account)
    }

    fn derive(&self, path: &DerivationPath, pin: bool) -> Result<Account, AccountsError> {
        let address = self.state.derive_address(path)?;
        let account = Account::new(address, self.state.account_url(path));
        if pin {
            self.state.pin(path, address);
        }
        Ok(account)
    }

    fn self_derive(&self, bases: &[DerivationPath], chain: Arc<dyn ChainStateReader>) {
        let mut scanner = self.state.scanner.lock().unwrap();
        if let Some(previous) = scanner.take() {
            previous.signal_stop();
        }
        if bases.is_empty() {
            return;
        }
        *scanner = Some(SelfDeriver::spawn(
            self.state.clone(),
            bases.to_vec(),
            chain,
            self.state.policy.gap_limit(),
        ));
    }

    fn sign_hash(
        &self,
        account: &Account,
        hash: &[u8; 32],
    ) -> Result<RecoverableSignature, AccountsError> {
        let path = self.tracked_path(account)?;
        let session = self.state.session.read().unwrap();
        let master = session.as_ref().ok_or_else(|| {
            AccountsError::Authentication("wallet closed, open it first".to_string())
        })?;
        // Unlock-sign-relock: the derived key exists only for this call.
        let node = master.derive_path(&path)?;
        Ok(node.private_key().sign_hash(hash)?)
    }

    fn sign_hash_with_passphrase(
        &self,
        account: &Account,
        passphrase: &str,
        hash: &[u8; 32],
    ) -> Result<RecoverableSignature, AccountsError> {
        let path = self.tracked_path(account)?;
        // Bypass the session entirely: unseal, derive, sign, release.
        let seed = self.state.sealed.open(passphrase)?;
        let master = ExtendedPrivateKey::new_master(&seed)?;
        let node = master.derive_path(&path)?;
        Ok(node.private_key().sign_hash(hash)?)
    }
}

/// Backend aggregating seed-backed wallets.
pub struct HdBackend {
    wallets: RwLock<BTreeMap<Url, Arc<HdWallet>>>,
    policy: SelfDerivePolicy,
    bus: EventBus,
}

impl HdBackend {
    /// Create an empty backend with default policy and event capacity.
    pub fn new() -> Self {
        Self::with_policy(SelfDerivePolicy::default(), DEFAULT_EVENT_CAPACITY)
    }

    /// Create a backend with explicit discovery policy and event capacity.
    pub fn with_policy(policy: SelfDerivePolicy, event_capacity: usize) -> Self {
        HdBackend {
            wallets: RwLock::new(BTreeMap::new()),
            policy,
            bus: EventBus::with_capacity(event_capacity),
        }
    }

    /// Register a wallet for a sealed seed and announce its arrival.
    pub fn add_wallet(
        &self,
        name: &str,
        sealed: SealedBlob,
    ) -> Result<Arc<HdWallet>, AccountsError> {
        let url = Url::new(HD_SCHEME, name);
        let mut wallets = self.wallets.write().unwrap();
        if wallets.contains_key(&url) {
            return Err(AccountsError::Io(format!(
                "wallet {} already registered",
                url
            )));
        }
        let wallet = Arc::new(HdWallet::with_bus(
            name,
            sealed,
            self.policy,
            self.bus.clone(),
        ));
        wallets.insert(url.clone(), wallet.clone());
        drop(wallets);
        self.bus.publish(url, WalletEventKind::Arrived);
        Ok(wallet)
    }

    /// Close and unregister a wallet, announcing its departure.
    pub fn remove_wallet(&self, url: &Url) -> Result<(), AccountsError> {
        let removed = self.wallets.write().unwrap().remove(url);
        match removed {
            Some(wallet) => {
                let _ = wallet.close();
                self.bus.publish(url.clone(), WalletEventKind::Dropped);
                Ok(())
            }
            None => Err(AccountsError::NotFound(format!("unknown wallet {}", url))),
        }
    }
}

impl Default for HdBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for HdBackend {
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
    use std::collections::HashSet;
    use std::sync::atomic::AtomicBool;

    use crate::hashing::text_hash;
    use crate::selfderive::scan_base;

    const PASSPHRASE: &str = "seed passphrase";

    fn sealed_seed() -> SealedBlob {
        SealedBlob::seal(&[0x42u8; 32], PASSPHRASE)
    }

    fn open_wallet() -> HdWallet {
        let wallet = HdWallet::new("seed-1", sealed_seed());
        wallet.open(PASSPHRASE).unwrap();
        wallet
    }

    fn base() -> DerivationPath {
        "m/44'/60'/0'/0".parse().unwrap()
    }

    fn path_at(index: u32) -> DerivationPath {
        format!("m/44'/60'/0'/0/{}", index).parse().unwrap()
    }

    /// Chain fixture: a set of active addresses, recording every query.
    struct MapReader {
        active: HashSet<Address>,
        queried: Mutex<Vec<Address>>,
    }

    impl MapReader {
        fn new(active: impl IntoIterator<Item = Address>) -> Self {
            MapReader {
                active: active.into_iter().collect(),
                queried: Mutex::new(Vec::new()),
            }
        }

        fn query_count(&self) -> usize {
            self.queried.lock().unwrap().len()
        }
    }

    impl ChainStateReader for MapReader {
        fn has_activity(&self, address: &Address) -> Result<bool, AccountsError> {
            self.queried.lock().unwrap().push(*address);
            Ok(self.active.contains(address))
        }
    }

    /// Address the open test wallet derives at base/index.
    fn address_at(wallet: &HdWallet, index: u32) -> Address {
        wallet.derive(&path_at(index), false).unwrap().address
    }

    #[test]
    fn test_open_close_lifecycle() {
        let wallet = HdWallet::new("seed-1", sealed_seed());
        assert_eq!(wallet.status(), "Closed");

        wallet.open(PASSPHRASE).unwrap();
        assert!(wallet.status().starts_with("Open"));
        assert!(matches!(
            wallet.open(PASSPHRASE).unwrap_err(),
            AccountsError::AlreadyOpen
        ));

        wallet.close().unwrap();
        wallet.close().unwrap(); // idempotent
        assert_eq!(wallet.status(), "Closed");
    }

    #[test]
    fn test_open_with_wrong_passphrase() {
        let wallet = HdWallet::new("seed-1", sealed_seed());
        let err = wallet.open("not the passphrase").unwrap_err();
        assert!(matches!(err, AccountsError::Authentication(_)));
        assert_eq!(wallet.status(), "Closed");
    }

    #[test]
    fn test_derive_requires_open_wallet() {
        let wallet = HdWallet::new("seed-1", sealed_seed());
        let err = wallet.derive(&path_at(0), false).unwrap_err();
        assert!(matches!(err, AccountsError::Authentication(_)));
    }

    #[test]
    fn test_derive_is_deterministic_and_pins_once() {
        let wallet = open_wallet();
        let path = path_at(3);

        let first = wallet.derive(&path, true).unwrap();
        let second = wallet.derive(&path, true).unwrap();
        assert_eq!(first, second);

        // Pinned exactly once, no duplication.
        let tracked = wallet.accounts();
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0], first);
        assert!(wallet.contains(&first));
    }

    #[test]
    fn test_unpinned_derivation_is_not_retained() {
        let wallet = open_wallet();
        let account = wallet.derive(&path_at(5), false).unwrap();
        assert!(wallet.accounts().is_empty());
        assert!(!wallet.contains(&account));
    }

    #[test]
    fn test_account_urls_are_distinct_per_path() {
        let wallet = open_wallet();
        let a = wallet.derive(&path_at(0), true).unwrap();
        let b = wallet.derive(&path_at(1), true).unwrap();
        assert_ne!(a.url, b.url);
        assert!(a.url.path.starts_with("seed-1/"));
    }

    #[test]
    fn test_sign_hash_for_pinned_account() {
        let wallet = open_wallet();
        let account = wallet.derive(&path_at(2), true).unwrap();
        let hash = text_hash(b"hd signing");

        let sig = wallet.sign_hash(&account, &hash).unwrap();
        assert_eq!(sig.recover_address(&hash).unwrap(), account.address);
    }

    #[test]
    fn test_sign_hash_unknown_account() {
        let wallet = open_wallet();
        let stranger = Account::new(
            Address::new([9u8; 20]),
            Url::new(HD_SCHEME, "seed-1/m/0"),
        );
        let err = wallet
            .sign_hash(&stranger, &text_hash(b"x"))
            .unwrap_err();
        assert!(matches!(err, AccountsError::NotFound(_)));
    }

    #[test]
    fn test_passphrase_signing_works_on_closed_wallet() {
        let wallet = open_wallet();
        let account = wallet.derive(&path_at(0), true).unwrap();
        wallet.close().unwrap();

        // Session signing is refused...
        let hash = text_hash(b"one shot");
        assert!(matches!(
            wallet.sign_hash(&account, &hash).unwrap_err(),
            AccountsError::Authentication(_)
        ));
        // ...but the one-shot passphrase path unlocks, signs, and relocks.
        let sig = wallet
            .sign_hash_with_passphrase(&account, PASSPHRASE, &hash)
            .unwrap();
        assert_eq!(sig.recover_address(&hash).unwrap(), account.address);
        assert_eq!(wallet.status(), "Closed");

        assert!(wallet
            .sign_hash_with_passphrase(&account, "typo", &hash)
            .is_err());
    }

    // ---- gap-limited discovery ----

    #[test]
    fn test_discovery_continues_past_gap_when_activity_resumes() {
        let wallet = open_wallet();
        // Activity at indices 0, 1, 3 with a gap limit of 2: index 2 is one
        // empty probe, activity at 3 resets the counter, then 4 and 5 empty
        // stop the scan.
        let reader = MapReader::new([
            address_at(&wallet, 0),
            address_at(&wallet, 1),
            address_at(&wallet, 3),
        ]);

        scan_base(
            wallet.state.as_ref(),
            &base(),
            &reader,
            &AtomicBool::new(false),
            2,
        );

        let tracked: Vec<_> = wallet.accounts().iter().map(|a| a.address).collect();
        assert_eq!(
            tracked,
            vec![
                address_at(&wallet, 0),
                address_at(&wallet, 1),
                address_at(&wallet, 3)
            ]
        );
        // Probed exactly indices 0 through 5.
        assert_eq!(reader.query_count(), 6);
    }

    #[test]
    fn test_discovery_halts_at_gap_limit() {
        let wallet = open_wallet();
        // Activity only at 0 and 1, gap limit 2: empty probes at 2 and 3
        // halt the scan after index 3.
        let reader = MapReader::new([address_at(&wallet, 0), address_at(&wallet, 1)]);

        scan_base(
            wallet.state.as_ref(),
            &base(),
            &reader,
            &AtomicBool::new(false),
            2,
        );

        assert_eq!(wallet.accounts().len(), 2);
        assert_eq!(reader.query_count(), 4); // indices 0..=3
    }

    #[test]
    fn test_reinvocation_reprobes_the_boundary() {
        let wallet = open_wallet();
        let reader = MapReader::new([address_at(&wallet, 0)]);
        scan_base(
            wallet.state.as_ref(),
            &base(),
            &reader,
            &AtomicBool::new(false),
            2,
        );
        assert_eq!(wallet.accounts().len(), 1);

        // A transaction lands at index 1; a renewed scan resumes from the
        // committed cursor and finds it.
        let reader = MapReader::new([address_at(&wallet, 1)]);
        scan_base(
            wallet.state.as_ref(),
            &base(),
            &reader,
            &AtomicBool::new(false),
            2,
        );
        assert_eq!(wallet.accounts().len(), 2);
    }

    #[test]
    fn test_stop_flag_halts_before_next_step() {
        let wallet = open_wallet();
        let reader = MapReader::new([address_at(&wallet, 0)]);
        let stop = AtomicBool::new(true);
        scan_base(wallet.state.as_ref(), &base(), &reader, &stop, 2);
        assert!(wallet.accounts().is_empty());
        assert_eq!(reader.query_count(), 0);
    }

    #[test]
    fn test_closed_wallet_stops_discovery() {
        let wallet = open_wallet();
        let reader = MapReader::new([address_at(&wallet, 0)]);
        wallet.close().unwrap();
        scan_base(
            wallet.state.as_ref(),
            &base(),
            &reader,
            &AtomicBool::new(false),
            2,
        );
        // Derivation fails on the closed wallet before any chain query.
        assert!(wallet.accounts().is_empty());
        assert_eq!(reader.query_count(), 0);
    }

    #[test]
    fn test_self_derive_background_loop() {
        let wallet = open_wallet();
        let reader = Arc::new(MapReader::new([
            address_at(&wallet, 0),
            address_at(&wallet, 1),
        ]));

        wallet.self_derive(&[base()], reader);

        // The loop runs on its own thread; poll for its result.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while wallet.accounts().len() < 2 {
            assert!(
                std::time::Instant::now() < deadline,
                "discovery did not finish in time"
            );
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        let tracked = wallet.accounts();
        assert_eq!(tracked.len(), 2);
        assert_eq!(tracked[0].address, address_at(&wallet, 0));
    }

    // ---- backend ----

    #[test]
    fn test_hd_backend_lifecycle_events() {
        let backend = HdBackend::new();
        let mut sub = backend.subscribe();

        let wallet = backend.add_wallet("seed-1", sealed_seed()).unwrap();
        let arrived = sub.try_recv().unwrap();
        assert_eq!(arrived.kind, WalletEventKind::Arrived);
        assert_eq!(arrived.url, wallet.url());

        wallet.open(PASSPHRASE).unwrap();
        assert_eq!(sub.try_recv().unwrap().kind, WalletEventKind::Opened);

        backend.remove_wallet(&wallet.url()).unwrap();
        assert_eq!(sub.try_recv().unwrap().kind, WalletEventKind::Dropped);
        assert!(backend.wallets().is_empty());
        // Removal closed the wallet.
        assert_eq!(wallet.status(), "Closed");
    }

    #[test]
    fn test_hd_backend_rejects_duplicate_names() {
        let backend = HdBackend::new();
        backend.add_wallet("seed-1", sealed_seed()).unwrap();
        assert!(backend.add_wallet("seed-1", sealed_seed()).is_err());
    }

    #[test]
    fn test_hd_backend_remove_unknown() {
        let backend = HdBackend::new();
        let err = backend
            .remove_wallet(&Url::new(HD_SCHEME, "ghost"))
            .unwrap_err();
        assert!(matches!(err, AccountsError::NotFound(_)));
    }
}
