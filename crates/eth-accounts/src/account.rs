//! Accounts and wallet locators.
//!
//! An account pairs a derived 20-byte address with the URL of the wallet that
//! can sign for it. URL equality is the identity test for "same wallet or
//! account" across refresh cycles.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use eth_primitives::address::Address;

use crate::AccountsError;

/// Mimetype selecting the personal-message signing scheme.
pub const MIMETYPE_TEXT_PLAIN: &str = "text/plain";
/// Mimetype selecting the structured typed-data signing scheme.
pub const MIMETYPE_TYPED_DATA: &str = "data/typed";
/// Mimetype selecting the validator-bound data signing scheme.
pub const MIMETYPE_DATA_WITH_VALIDATOR: &str = "data/validator";
/// Mimetype selecting the clique block-header signing scheme.
pub const MIMETYPE_CLIQUE: &str = "application/x-clique-header";

/// An opaque wallet/account locator of the form `scheme://path`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Url {
    /// Protocol scheme identifying the backend type, e.g. `keystore`.
    pub scheme: String,
    /// Backend-specific path identifying the wallet or account.
    pub path: String,
}

impl Url {
    /// Build a locator from its parts.
    pub fn new(scheme: &str, path: &str) -> Self {
        Url {
            scheme: scheme.to_string(),
            path: path.to_string(),
        }
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.path)
    }
}

impl fmt::Debug for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Url {
    type Err = AccountsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once("://") {
            Some((scheme, path)) if !scheme.is_empty() => Ok(Url::new(scheme, path)),
            _ => Err(AccountsError::Encoding(format!(
                "locator missing scheme: {:?}",
                s
            ))),
        }
    }
}

impl Serialize for Url {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Url {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Url::from_str(&s).map_err(D::Error::custom)
    }
}

/// An account located at a specific wallet.
///
/// The address is always derived, never chosen, and the pair is immutable
/// once created; removal from a backend's tracked set is the only way an
/// account goes away (the underlying stored key is untouched).
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Account {
    /// The 20-byte address derived from the account's key.
    pub address: Address,
    /// Locator of the wallet that owns the key.
    pub url: Url,
}

impl Account {
    /// Pair an address with its wallet locator.
    pub fn new(address: Address, url: Url) -> Self {
        Account { address, url }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.url)
    }
}
