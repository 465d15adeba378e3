//! Gap-limited background account discovery.
//!
//! One scanner runs per hierarchical wallet. For each base path it keeps a
//! cursor from child index 0 and probes the chain for activity at every
//! derived address: an active address is pinned and resets the empty-probe
//! counter, an inactive one advances it, and the base path stops extending
//! once the counter reaches the gap limit. A renewed invocation re-probes
//! the boundary from the last pinned index, since a transaction may have
//! landed there in the meantime.
//!
//! Candidates are derived and the chain is queried WITHOUT holding wallet
//! locks; only the commit of a pinned account takes the exclusive lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use eth_primitives::address::Address;
use eth_primitives::bip32::{ChildNumber, DerivationPath};

use crate::account::Account;
use crate::chain::ChainStateReader;
use crate::AccountsError;

/// Tracked-account bookkeeping shared by hierarchical wallet variants.
///
/// Remembers which accounts are pinned, the derivation path behind each
/// address (signing re-derives through it), and the per-base resume cursor
/// for the discovery scanner. Guarded internally; all methods take the lock
/// briefly.
pub(crate) struct PathTracker {
    inner: RwLock<TrackerInner>,
}

struct TrackerInner {
    accounts: Vec<Account>,
    paths: HashMap<Address, DerivationPath>,
    cursors: HashMap<DerivationPath, u32>,
}

impl PathTracker {
    pub(crate) fn new() -> Self {
        PathTracker {
            inner: RwLock::new(TrackerInner {
                accounts: Vec::new(),
                paths: HashMap::new(),
                cursors: HashMap::new(),
            }),
        }
    }

    /// Pin an account, remembering its derivation path. Idempotent per
    /// address: a second pin of the same address changes nothing.
    pub(crate) fn pin(&self, account: Account, path: DerivationPath) {
        let mut inner = self.inner.write().unwrap();
        if !inner.paths.contains_key(&account.address) {
            inner.paths.insert(account.address, path);
            inner.accounts.push(account);
        }
    }

    pub(crate) fn accounts(&self) -> Vec<Account> {
        self.inner.read().unwrap().accounts.clone()
    }

    pub(crate) fn contains(&self, account: &Account) -> bool {
        self.inner
            .read()
            .unwrap()
            .accounts
            .iter()
            .any(|a| a == account)
    }

    pub(crate) fn path_of(&self, address: &Address) -> Option<DerivationPath> {
        self.inner.read().unwrap().paths.get(address).cloned()
    }

    pub(crate) fn count(&self) -> usize {
        self.inner.read().unwrap().accounts.len()
    }

    pub(crate) fn cursor(&self, base: &DerivationPath) -> u32 {
        self.inner
            .read()
            .unwrap()
            .cursors
            .get(base)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn store_cursor(&self, base: &DerivationPath, next: u32) {
        self.inner
            .write()
            .unwrap()
            .cursors
            .insert(base.clone(), next);
    }
}

/// What a hierarchical wallet exposes to its scanner.
///
/// `derive_candidate` and the chain query run off-lock; `pin` and the cursor
/// accessors are expected to take the wallet's exclusive lock briefly.
pub(crate) trait DerivationSource: Send + Sync + 'static {
    /// Derive the address at `path`, or fail if the wallet has closed.
    fn derive_candidate(&self, path: &DerivationPath) -> Result<Address, AccountsError>;

    /// Commit a discovered account into the tracked set.
    fn pin(&self, path: &DerivationPath, address: Address);

    /// The committed resume index for a base path.
    fn cursor(&self, base: &DerivationPath) -> u32;

    /// Persist the resume index for a base path.
    fn store_cursor(&self, base: &DerivationPath, next: u32);
}

/// Handle to a running scanner thread.
pub(crate) struct SelfDeriver {
    stop: Arc<AtomicBool>,
}

impl SelfDeriver {
    /// Start a scanner over `bases` on its own named thread.
    ///
    /// Returns immediately. The thread makes one gap-limited pass over every
    /// base path and exits; it re-checks the stop flag before each discovery
    /// step, so `signal_stop` takes effect between steps.
    pub(crate) fn spawn<S: DerivationSource>(
        source: Arc<S>,
        bases: Vec<DerivationPath>,
        chain: Arc<dyn ChainStateReader>,
        gap_limit: u32,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let builder = thread::Builder::new().name("self-derive".to_string());
        // Spawning can only fail when the OS is out of threads; surface that
        // as a scanner that never ran rather than a panic.
        let _ = builder.spawn(move || {
            for base in &bases {
                if flag.load(Ordering::Relaxed) {
                    return;
                }
                scan_base(source.as_ref(), base, chain.as_ref(), &flag, gap_limit);
            }
        });
        SelfDeriver { stop }
    }

    /// Ask the scanner to stop before its next discovery step.
    pub(crate) fn signal_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for SelfDeriver {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

/// One gap-limited pass along a single base path.
///
/// Exposed within the crate so tests can drive a scan synchronously.
pub(crate) fn scan_base<S: DerivationSource + ?Sized>(
    source: &S,
    base: &DerivationPath,
    chain: &dyn ChainStateReader,
    stop: &AtomicBool,
    gap_limit: u32,
) {
    let mut cursor = source.cursor(base);
    let mut empty_probes = 0u32;

    while empty_probes < gap_limit {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        let child = match ChildNumber::from_normal_idx(cursor) {
            Ok(child) => child,
            Err(_) => return, // the branch is exhausted
        };
        let path = base.child(child);

        // Derivation takes only a brief shared lock inside the source.
        let address = match source.derive_candidate(&path) {
            Ok(address) => address,
            Err(_) => return, // wallet closed mid-scan
        };

        // The chain query may block on I/O; no locks are held here.
        let active = match chain.has_activity(&address) {
            Ok(active) => active,
            Err(_) => return, // chain unavailable; retry on next invocation
        };

        if stop.load(Ordering::Relaxed) {
            return;
        }

        if active {
            source.pin(&path, address);
            empty_probes = 0;
            cursor += 1;
            // Resume from just past the last activity next time.
            source.store_cursor(base, cursor);
        } else {
            empty_probes += 1;
            cursor += 1;
        }
    }
}
