//! 20-byte account addresses.
//!
//! An address is the last 20 bytes of the Keccak-256 hash of the uncompressed
//! public key (the leading SEC1 format byte excluded). Text form is hex with
//! an EIP-55 mixed-case checksum.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hash::keccak256;
use crate::PrimitivesError;

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Create an address from a raw 20-byte array.
    pub fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Address(bytes)
    }

    /// Create an address from a byte slice.
    ///
    /// # Arguments
    /// * `bytes` - Exactly 20 bytes.
    ///
    /// # Returns
    /// `Ok(Address)` or an error if the slice has the wrong length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != ADDRESS_LEN {
            return Err(PrimitivesError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                ADDRESS_LEN,
                bytes.len()
            )));
        }
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(bytes);
        Ok(Address(out))
    }

    /// Parse an address from a hex string, with or without a `0x` prefix.
    ///
    /// Accepts lowercase, uppercase, or EIP-55 mixed-case input. Mixed-case
    /// input is NOT checksum-validated here; use [`Address::parse_checksummed`]
    /// when the checksum must be enforced.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(stripped)?;
        Self::from_slice(&bytes)
    }

    /// Parse a hex address and enforce its EIP-55 checksum.
    ///
    /// All-lowercase and all-uppercase forms carry no checksum and are
    /// accepted as-is; any mixed-case form must match the checksummed
    /// rendering exactly.
    pub fn parse_checksummed(hex_str: &str) -> Result<Self, PrimitivesError> {
        let addr = Self::from_hex(hex_str)?;
        let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let is_uniform_case = stripped == stripped.to_lowercase()
            || stripped == stripped.to_uppercase();
        if !is_uniform_case && addr.to_checksum_hex() != format!("0x{}", stripped) {
            return Err(PrimitivesError::InvalidAddress(format!(
                "checksum mismatch in {}",
                hex_str
            )));
        }
        Ok(addr)
    }

    /// Derive an address from uncompressed public key bytes.
    ///
    /// The input is the 65-byte SEC1 encoding `0x04 || X || Y`; the format byte
    /// is excluded from hashing and the address is the last 20 bytes of the
    /// Keccak-256 digest.
    pub fn from_uncompressed_pubkey(pubkey: &[u8; 65]) -> Self {
        let hash = keccak256(&pubkey[1..]);
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&hash[12..]);
        Address(out)
    }

    /// The raw 20 bytes of the address.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Render as lowercase hex with a `0x` prefix.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Render as EIP-55 checksummed hex with a `0x` prefix.
    ///
    /// A hex letter is uppercased when the corresponding nibble of
    /// `keccak256(lowercase_hex)` is 8 or above.
    pub fn to_checksum_hex(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());
        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, ch) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if ch.is_ascii_alphabetic() && nibble >= 8 {
                out.push(ch.to_ascii_uppercase());
            } else {
                out.push(ch);
            }
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum_hex())
    }
}

impl FromStr for Address {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_checksummed(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse_checksummed(&s).map_err(D::Error::custom)
    }
}
