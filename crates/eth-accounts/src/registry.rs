//! Concurrency-guarded account registry.
//!
//! Backends keep a locator-to-account map plus an address index behind one
//! `RwLock`, so lookups avoid rescanning the underlying storage. Readers take
//! the shared lock briefly; mutators take the exclusive lock. The registry
//! enforces the tracked-set invariants: no duplicate locator, and no address
//! tracked under two different locators.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use eth_primitives::address::Address;

use crate::account::{Account, Url};

/// Result of attempting to add an account to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The account was inserted.
    Inserted,
    /// An identical account was already present; nothing changed.
    AlreadyTracked,
    /// The address is already tracked under a different locator; nothing
    /// changed. Accepting the insert would break the tracked-set invariant.
    AddressCollision,
}

/// A guarded registry mapping locators and addresses to accounts.
pub struct AccountCache {
    inner: RwLock<CacheInner>,
}

struct CacheInner {
    by_url: BTreeMap<Url, Account>,
    by_address: HashMap<Address, Url>,
}

impl AccountCache {
    /// Create an empty registry.
    pub fn new() -> Self {
        AccountCache {
            inner: RwLock::new(CacheInner {
                by_url: BTreeMap::new(),
                by_address: HashMap::new(),
            }),
        }
    }

    /// Add an account, upholding the tracked-set invariants.
    pub fn add(&self, account: Account) -> AddOutcome {
        let mut inner = self.inner.write().unwrap();
        if let Some(existing) = inner.by_address.get(&account.address) {
            return if *existing == account.url {
                AddOutcome::AlreadyTracked
            } else {
                AddOutcome::AddressCollision
            };
        }
        if inner.by_url.contains_key(&account.url) {
            // Same locator, different address: the locator is taken.
            return AddOutcome::AddressCollision;
        }
        inner
            .by_address
            .insert(account.address, account.url.clone());
        inner.by_url.insert(account.url.clone(), account);
        AddOutcome::Inserted
    }

    /// Remove the account at a locator, returning it if present.
    pub fn remove(&self, url: &Url) -> Option<Account> {
        let mut inner = self.inner.write().unwrap();
        let account = inner.by_url.remove(url)?;
        inner.by_address.remove(&account.address);
        Some(account)
    }

    /// Look up the account tracked for an address.
    pub fn by_address(&self, address: &Address) -> Option<Account> {
        let inner = self.inner.read().unwrap();
        let url = inner.by_address.get(address)?;
        inner.by_url.get(url).cloned()
    }

    /// Whether the exact (address, locator) pair is tracked.
    pub fn contains(&self, account: &Account) -> bool {
        let inner = self.inner.read().unwrap();
        inner.by_url.get(&account.url) == Some(account)
    }

    /// Snapshot of all tracked accounts, ordered by locator.
    pub fn accounts(&self) -> Vec<Account> {
        let inner = self.inner.read().unwrap();
        inner.by_url.values().cloned().collect()
    }

    /// Number of tracked accounts.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().by_url.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AccountCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(addr_byte: u8, path: &str) -> Account {
        Account::new(Address::new([addr_byte; 20]), Url::new("keystore", path))
    }

    #[test]
    fn test_add_and_lookup() {
        let cache = AccountCache::new();
        let a = account(1, "a");
        assert_eq!(cache.add(a.clone()), AddOutcome::Inserted);
        assert!(cache.contains(&a));
        assert_eq!(cache.by_address(&a.address), Some(a));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_duplicate_add_is_idempotent() {
        let cache = AccountCache::new();
        let a = account(1, "a");
        assert_eq!(cache.add(a.clone()), AddOutcome::Inserted);
        assert_eq!(cache.add(a.clone()), AddOutcome::AlreadyTracked);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_address_collision_rejected() {
        let cache = AccountCache::new();
        assert_eq!(cache.add(account(1, "a")), AddOutcome::Inserted);
        // Same address under a different locator must not enter the set.
        assert_eq!(cache.add(account(1, "b")), AddOutcome::AddressCollision);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.by_address(&Address::new([1; 20])).unwrap().url.path, "a");
    }

    #[test]
    fn test_locator_collision_rejected() {
        let cache = AccountCache::new();
        assert_eq!(cache.add(account(1, "a")), AddOutcome::Inserted);
        assert_eq!(cache.add(account(2, "a")), AddOutcome::AddressCollision);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove() {
        let cache = AccountCache::new();
        let a = account(1, "a");
        cache.add(a.clone());
        assert_eq!(cache.remove(&a.url), Some(a.clone()));
        assert!(!cache.contains(&a));
        assert_eq!(cache.remove(&a.url), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_accounts_sorted_by_locator() {
        let cache = AccountCache::new();
        cache.add(account(3, "c"));
        cache.add(account(1, "a"));
        cache.add(account(2, "b"));
        let paths: Vec<_> = cache
            .accounts()
            .into_iter()
            .map(|a| a.url.path)
            .collect();
        assert_eq!(paths, vec!["a", "b", "c"]);
    }
}
