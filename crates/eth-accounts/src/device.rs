//! Wallets backed by external signing devices.
//!
//! The device holds the seed and does all derivation and signing itself; key
//! material never crosses the transport boundary. That boundary is the
//! `Device` trait; USB, HID, or any other concrete transport lives behind
//! it. A hub backend enumerates the currently connected devices and
//! turns connects and disconnects into wallet events.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use eth_primitives::address::Address;
use eth_primitives::bip32::DerivationPath;
use eth_primitives::ec::RecoverableSignature;

use crate::account::{Account, Url};
use crate::chain::ChainStateReader;
use crate::events::{EventBus, Subscription, WalletEventKind, DEFAULT_EVENT_CAPACITY};
use crate::hd::SelfDerivePolicy;
use crate::selfderive::{DerivationSource, PathTracker, SelfDeriver};
use crate::wallet::{Backend, Wallet};
use crate::AccountsError;

/// Locator scheme for device-backed wallets.
pub const DEVICE_SCHEME: &str = "device";

/// Transport boundary to an external key-holding device.
///
/// Calls may be slow (user confirmation, wire round-trips) and can fail at
/// any time if the device disconnects; such faults surface as `Io` errors
/// and the hub converts the disconnect into a `Dropped` event.
pub trait Device: Send + Sync {
    /// Stable identifier used as the wallet's locator path.
    fn id(&self) -> String;

    /// Transport-level status text, shown to users verbatim.
    fn device_status(&self) -> String;

    /// Establish a session with the device.
    ///
    /// The passphrase is forwarded as-is; devices that prompt on-screen
    /// ignore it.
    fn open(&self, passphrase: &str) -> Result<(), AccountsError>;

    /// End the session. Must tolerate an already-closed device.
    fn close(&self);

    /// Ask the device for the address at a derivation path.
    fn derive_address(&self, path: &DerivationPath) -> Result<Address, AccountsError>;

    /// Ask the device to sign a 32-byte hash with the key at a path.
    fn sign_hash(
        &self,
        path: &DerivationPath,
        hash: &[u8; 32],
    ) -> Result<RecoverableSignature, AccountsError>;
}

struct DeviceState {
    url: Url,
    device: Arc<dyn Device>,
    open: RwLock<bool>,
    tracked: PathTracker,
    scanner: Mutex<Option<SelfDeriver>>,
    policy: SelfDerivePolicy,
    bus: EventBus,
}

impl DeviceState {
    fn account_url(&self, path: &DerivationPath) -> Url {
        Url::new(DEVICE_SCHEME, &format!("{}/{}", self.url.path, path))
    }

    fn require_open(&self) -> Result<(), AccountsError> {
        if *self.open.read().unwrap() {
            Ok(())
        } else {
            Err(AccountsError::Authentication(
                "device wallet closed, open it first".to_string(),
            ))
        }
    }
}

impl DerivationSource for DeviceState {
    fn derive_candidate(&self, path: &DerivationPath) -> Result<Address, AccountsError> {
        self.require_open()?;
        // The wire round-trip happens without any wallet lock held.
        self.device.derive_address(path)
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

/// A wallet whose keys live on an external device.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct DeviceWallet {
    state: Arc<DeviceState>,
}

impl DeviceWallet {
    /// Wrap a device with the default discovery policy.
    pub fn new(device: Arc<dyn Device>) -> Self {
        Self::with_policy(device, SelfDerivePolicy::default())
    }

    /// Wrap a device with an explicit discovery policy.
    pub fn with_policy(device: Arc<dyn Device>, policy: SelfDerivePolicy) -> Self {
        Self::with_bus(device, policy, EventBus::new())
    }

    pub(crate) fn with_bus(
        device: Arc<dyn Device>,
        policy: SelfDerivePolicy,
        bus: EventBus,
    ) -> Self {
        DeviceWallet {
            state: Arc::new(DeviceState {
                url: Url::new(DEVICE_SCHEME, &device.id()),
                device,
                open: RwLock::new(false),
                tracked: PathTracker::new(),
                scanner: Mutex::new(None),
                policy,
                bus,
            }),
        }
    }
}

impl Wallet for DeviceWallet {
    fn url(&self) -> Url {
        self.state.url.clone()
    }

    fn status(&self) -> String {
        if *self.state.open.read().unwrap() {
            self.state.device.device_status()
        } else {
            "Closed".to_string()
        }
    }

    fn open(&self, passphrase: &str) -> Result<(), AccountsError> {
        let mut open = self.state.open.write().unwrap();
        if *open {
            return Err(AccountsError::AlreadyOpen);
        }
        self.state.device.open(passphrase)?;
        *open = true;
        drop(open);
        self.state.bus.publish(self.url(), WalletEventKind::Opened);
        Ok(())
    }

    fn close(&self) -> Result<(), AccountsError> {
        if let Some(scanner) = self.state.scanner.lock().unwrap().take() {
            scanner.signal_stop();
        }
        let mut open = self.state.open.write().unwrap();
        if *open {
            self.state.device.close();
            *open = false;
        }
        Ok(())
    }

    fn accounts(&self) -> Vec<Account> {
        self.state.tracked.accounts()
    }

    fn contains(&self, account: &Account) -> bool {
        self.state.tracked.contains(account)
    }

    fn derive(&self, path: &DerivationPath, pin: bool) -> Result<Account, AccountsError> {
        self.state.require_open()?;
        let address = self.state.device.derive_address(path)?;
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
        if !self.contains(account) {
            return Err(AccountsError::NotFound(format!(
                "unknown account {}",
                account.address
            )));
        }
        let path = self
            .state
            .tracked
            .path_of(&account.address)
            .ok_or_else(|| {
                AccountsError::NotFound(format!("no derivation path for {}", account.address))
            })?;
        self.state.require_open()?;
        // The device may block for user confirmation here.
        self.state.device.sign_hash(&path, hash)
    }

    fn sign_hash_with_passphrase(
        &self,
        account: &Account,
        _passphrase: &str,
        hash: &[u8; 32],
    ) -> Result<RecoverableSignature, AccountsError> {
        // Devices authenticate on their own surface; the passphrase has no
        // meaning across the transport boundary.
        self.sign_hash(account, hash)
    }
}

/// Backend tracking the currently connected devices.
///
/// Callers feed it the result of each enumeration pass; the hub diffs that
/// against its wallet set, announcing arrivals and departures. A departed
/// wallet is closed, so in-flight calls on it fail instead of hanging.
pub struct DeviceHub {
    wallets: RwLock<BTreeMap<Url, DeviceWallet>>,
    policy: SelfDerivePolicy,
    bus: EventBus,
}

impl DeviceHub {
    /// Create an empty hub with default policy and event capacity.
    pub fn new() -> Self {
        Self::with_policy(SelfDerivePolicy::default(), DEFAULT_EVENT_CAPACITY)
    }

    /// Create a hub with explicit discovery policy and event capacity.
    pub fn with_policy(policy: SelfDerivePolicy, event_capacity: usize) -> Self {
        DeviceHub {
            wallets: RwLock::new(BTreeMap::new()),
            policy,
            bus: EventBus::with_capacity(event_capacity),
        }
    }

    /// Reconcile the wallet set against one enumeration of connected
    /// devices.
    ///
    /// Newly seen devices produce `Arrived` events; devices missing from
    /// `devices` are closed, removed, and produce `Dropped` events.
    pub fn refresh(&self, devices: Vec<Arc<dyn Device>>) {
        let mut arrived = Vec::new();
        let mut dropped = Vec::new();
        {
            let mut wallets = self.wallets.write().unwrap();
            let mut seen = BTreeMap::new();
            for device in devices {
                let url = Url::new(DEVICE_SCHEME, &device.id());
                let wallet = wallets.remove(&url).unwrap_or_else(|| {
                    arrived.push(url.clone());
                    DeviceWallet::with_bus(device, self.policy, self.bus.clone())
                });
                seen.insert(url, wallet);
            }
            for (url, wallet) in std::mem::take(&mut *wallets) {
                let _ = wallet.close();
                dropped.push(url);
            }
            *wallets = seen;
        }
        // Events go out after the lock is released.
        for url in arrived {
            self.bus.publish(url, WalletEventKind::Arrived);
        }
        for url in dropped {
            self.bus.publish(url, WalletEventKind::Dropped);
        }
    }

    /// The wallet for a connected device, if present.
    pub fn wallet(&self, url: &Url) -> Option<DeviceWallet> {
        self.wallets.read().unwrap().get(url).cloned()
    }
}

impl Default for DeviceHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for DeviceHub {
    fn wallets(&self) -> Vec<Arc<dyn Wallet>> {
        self.wallets
            .read()
            .unwrap()
            .values()
            .map(|w| Arc::new(w.clone()) as Arc<dyn Wallet>)
            .collect()
    }

    fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }
}
