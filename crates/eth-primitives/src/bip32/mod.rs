//! Hierarchical deterministic key derivation.
//!
//! Implements BIP-32 extended keys and derivation paths: a master key is
//! computed from a seed, and children are derived index by index, with
//! hardened indices mixing the parent private key into the child and normal
//! indices using only public material. The same (seed, path) pair always
//! yields the same key.

use std::fmt;
use std::str::FromStr;

use k256::elliptic_curve::group::Group;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::{Field, PrimeField};
use k256::{ProjectivePoint, Scalar};
use zeroize::Zeroize;

use crate::address::Address;
use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::hash::sha512_hmac;
use crate::PrimitivesError;

/// The index offset marking a hardened derivation step.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// HMAC key for master key derivation from a seed.
const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

/// A single step in a derivation path.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildNumber {
    /// A non-hardened index, derivable from public material alone.
    Normal { index: u32 },
    /// A hardened index, requiring the parent private key.
    Hardened { index: u32 },
}

impl ChildNumber {
    /// Create a normal (non-hardened) child number.
    ///
    /// # Arguments
    /// * `index` - The child index, below 2^31.
    pub fn from_normal_idx(index: u32) -> Result<Self, PrimitivesError> {
        if index >= HARDENED_OFFSET {
            return Err(PrimitivesError::InvalidChildIndex(format!(
                "index {} exceeds 2^31 - 1",
                index
            )));
        }
        Ok(ChildNumber::Normal { index })
    }

    /// Create a hardened child number.
    ///
    /// # Arguments
    /// * `index` - The child index, below 2^31.
    pub fn from_hardened_idx(index: u32) -> Result<Self, PrimitivesError> {
        if index >= HARDENED_OFFSET {
            return Err(PrimitivesError::InvalidChildIndex(format!(
                "index {} exceeds 2^31 - 1",
                index
            )));
        }
        Ok(ChildNumber::Hardened { index })
    }

    /// Decode from the wire representation, where the high bit marks a
    /// hardened step.
    pub fn from_u32(raw: u32) -> Self {
        if raw >= HARDENED_OFFSET {
            ChildNumber::Hardened {
                index: raw - HARDENED_OFFSET,
            }
        } else {
            ChildNumber::Normal { index: raw }
        }
    }

    /// Encode to the wire representation.
    pub fn to_u32(self) -> u32 {
        match self {
            ChildNumber::Normal { index } => index,
            ChildNumber::Hardened { index } => index + HARDENED_OFFSET,
        }
    }

    /// Whether this is a hardened step.
    pub fn is_hardened(self) -> bool {
        matches!(self, ChildNumber::Hardened { .. })
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildNumber::Normal { index } => write!(f, "{}", index),
            ChildNumber::Hardened { index } => write!(f, "{}'", index),
        }
    }
}

impl fmt::Debug for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for ChildNumber {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (digits, hardened) = match s.strip_suffix(['\'', 'h', 'H']) {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        let index: u32 = digits.parse().map_err(|_| {
            PrimitivesError::InvalidChildIndex(format!("not a child index: {:?}", s))
        })?;
        if hardened {
            ChildNumber::from_hardened_idx(index)
        } else {
            ChildNumber::from_normal_idx(index)
        }
    }
}

/// An ordered sequence of child numbers describing a key's location in the
/// derivation tree.
///
/// Text form is the conventional `m/44'/60'/0'/0` notation, with `'` (or `h`)
/// marking hardened steps.
#[derive(Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct DerivationPath(Vec<ChildNumber>);

impl DerivationPath {
    /// The empty path (the master key itself).
    pub fn master() -> Self {
        DerivationPath(Vec::new())
    }

    /// Build a path from child numbers.
    pub fn new(components: Vec<ChildNumber>) -> Self {
        DerivationPath(components)
    }

    /// Append one child number in place.
    pub fn push(&mut self, child: ChildNumber) {
        self.0.push(child);
    }

    /// Return a new path with one more child number appended.
    pub fn child(&self, child: ChildNumber) -> Self {
        let mut components = self.0.clone();
        components.push(child);
        DerivationPath(components)
    }

    /// The path's components in order.
    pub fn components(&self) -> &[ChildNumber] {
        &self.0
    }

    /// Number of components.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the empty (master) path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the components.
    pub fn iter(&self) -> std::slice::Iter<'_, ChildNumber> {
        self.0.iter()
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for child in &self.0 {
            write!(f, "/{}", child)?;
        }
        Ok(())
    }
}

impl fmt::Debug for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for DerivationPath {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        match parts.next() {
            Some("m") | Some("M") => {}
            _ => {
                return Err(PrimitivesError::InvalidDerivationPath(format!(
                    "path must start with m/: {:?}",
                    s
                )))
            }
        }
        let mut components = Vec::new();
        for part in parts {
            components.push(part.parse()?);
        }
        Ok(DerivationPath(components))
    }
}

impl FromIterator<ChildNumber> for DerivationPath {
    fn from_iter<I: IntoIterator<Item = ChildNumber>>(iter: I) -> Self {
        DerivationPath(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DerivationPath {
    type Item = &'a ChildNumber;
    type IntoIter = std::slice::Iter<'a, ChildNumber>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The canonical Ethereum account base path, `m/44'/60'/0'/0`.
///
/// Self-derivation appends the account index as a final normal component.
pub fn default_base_path() -> DerivationPath {
    "m/44'/60'/0'/0".parse().expect("static path is well formed")
}

/// The legacy account base path, `m/44'/60'/0'`, kept for wallets created
/// before the five-component convention settled.
pub fn legacy_base_path() -> DerivationPath {
    "m/44'/60'/0'".parse().expect("static path is well formed")
}

/// An extended private key: a private key plus the chain code that allows
/// deriving children.
///
/// The chain code is overwritten with zeros on drop; the wrapped private key
/// zeroizes itself.
pub struct ExtendedPrivateKey {
    key: PrivateKey,
    chain_code: [u8; 32],
    depth: u8,
}

impl ExtendedPrivateKey {
    /// Compute the master extended key from a seed.
    ///
    /// # Arguments
    /// * `seed` - Between 16 and 64 bytes of seed material.
    ///
    /// # Returns
    /// `Ok(ExtendedPrivateKey)`, or `InvalidSeed` if the seed length is out
    /// of range or the derived scalar is invalid (a probability below 2^-127).
    pub fn new_master(seed: &[u8]) -> Result<Self, PrimitivesError> {
        if seed.len() < 16 || seed.len() > 64 {
            return Err(PrimitivesError::InvalidSeed(format!(
                "seed must be 16..=64 bytes, got {}",
                seed.len()
            )));
        }
        let mut i = sha512_hmac(MASTER_HMAC_KEY, seed);
        let key = PrivateKey::from_bytes(&i[..32])
            .map_err(|e| PrimitivesError::InvalidSeed(e.to_string()));
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&i[32..]);
        i.zeroize();
        Ok(ExtendedPrivateKey {
            key: key?,
            chain_code,
            depth: 0,
        })
    }

    /// Derive one child extended key.
    ///
    /// Hardened steps mix the parent private key into the HMAC input; normal
    /// steps use the parent's compressed public key.
    pub fn derive_child(&self, child: ChildNumber) -> Result<Self, PrimitivesError> {
        let mut data = [0u8; 37];
        match child {
            ChildNumber::Hardened { .. } => {
                data[0] = 0x00;
                data[1..33].copy_from_slice(&self.key.to_bytes());
            }
            ChildNumber::Normal { .. } => {
                data[..33].copy_from_slice(&self.key.public_key().to_compressed());
            }
        }
        data[33..].copy_from_slice(&child.to_u32().to_be_bytes());

        let mut i = sha512_hmac(&self.chain_code, &data);
        data.zeroize();

        let mut il = [0u8; 32];
        il.copy_from_slice(&i[..32]);
        let il_scalar: Option<Scalar> = Scalar::from_repr(il.into()).into();
        il.zeroize();

        let result = il_scalar
            .ok_or(PrimitivesError::InvalidChildKey)
            .and_then(|il_scalar| {
                let mut parent_bytes = self.key.to_bytes();
                let parent_scalar: Option<Scalar> =
                    Scalar::from_repr(parent_bytes.into()).into();
                parent_bytes.zeroize();
                let parent_scalar =
                    parent_scalar.ok_or(PrimitivesError::InvalidChildKey)?;

                let child_scalar = il_scalar + parent_scalar;
                if bool::from(child_scalar.is_zero()) {
                    return Err(PrimitivesError::InvalidChildKey);
                }
                let mut child_bytes: [u8; 32] = child_scalar.to_repr().into();
                let key = PrivateKey::from_bytes(&child_bytes);
                child_bytes.zeroize();
                key
            });

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&i[32..]);
        i.zeroize();

        Ok(ExtendedPrivateKey {
            key: result?,
            chain_code,
            depth: self.depth.saturating_add(1),
        })
    }

    /// Walk a full derivation path, index by index.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, PrimitivesError> {
        let mut current = self.duplicate()?;
        for child in path {
            current = current.derive_child(*child)?;
        }
        Ok(current)
    }

    // Clone is not exposed, so copies of key material stay inside this module.
    fn duplicate(&self) -> Result<Self, PrimitivesError> {
        Ok(ExtendedPrivateKey {
            key: PrivateKey::from_bytes(&self.key.to_bytes())?,
            chain_code: self.chain_code,
            depth: self.depth,
        })
    }

    /// The private key at this node.
    pub fn private_key(&self) -> &PrivateKey {
        &self.key
    }

    /// The public key at this node.
    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    /// The account address at this node.
    pub fn address(&self) -> Address {
        self.key.address()
    }

    /// Tree depth of this node (0 for the master key).
    pub fn node_depth(&self) -> u8 {
        self.depth
    }

    /// The corresponding extended public key, able to derive along normal
    /// indices only.
    pub fn to_extended_public(&self) -> ExtendedPublicKey {
        ExtendedPublicKey {
            key: self.key.public_key(),
            chain_code: self.chain_code,
            depth: self.depth,
        }
    }
}

impl Drop for ExtendedPrivateKey {
    fn drop(&mut self) {
        self.chain_code.zeroize();
    }
}

impl fmt::Debug for ExtendedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Neither key nor chain code is printed.
        f.debug_struct("ExtendedPrivateKey")
            .field("depth", &self.depth)
            .field("address", &self.key.address())
            .finish()
    }
}

/// An extended public key: public material plus chain code.
///
/// Can derive children along normal indices; hardened steps require the
/// private key and fail here.
#[derive(Clone)]
pub struct ExtendedPublicKey {
    key: PublicKey,
    chain_code: [u8; 32],
    depth: u8,
}

impl ExtendedPublicKey {
    /// Derive one child extended public key.
    ///
    /// # Returns
    /// `HardenedFromPublic` when asked for a hardened step, since those mix
    /// in private material this key does not have.
    pub fn derive_child(&self, child: ChildNumber) -> Result<Self, PrimitivesError> {
        if child.is_hardened() {
            return Err(PrimitivesError::HardenedFromPublic);
        }

        let mut data = [0u8; 37];
        data[..33].copy_from_slice(&self.key.to_compressed());
        data[33..].copy_from_slice(&child.to_u32().to_be_bytes());

        let mut i = sha512_hmac(&self.chain_code, &data);

        let mut il = [0u8; 32];
        il.copy_from_slice(&i[..32]);
        let il_scalar: Option<Scalar> = Scalar::from_repr(il.into()).into();
        il.zeroize();
        let il_scalar = il_scalar.ok_or(PrimitivesError::InvalidChildKey)?;

        let parent_point = ProjectivePoint::from(*self.key.verifying_key().as_affine());
        let child_point = ProjectivePoint::GENERATOR * il_scalar + parent_point;
        if bool::from(child_point.is_identity()) {
            return Err(PrimitivesError::InvalidChildKey);
        }

        let encoded = child_point.to_affine().to_encoded_point(true);
        let key = PublicKey::from_bytes(encoded.as_bytes())?;

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&i[32..]);
        i.zeroize();

        Ok(ExtendedPublicKey {
            key,
            chain_code,
            depth: self.depth.saturating_add(1),
        })
    }

    /// Walk a full derivation path of normal indices.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, PrimitivesError> {
        let mut current = self.clone();
        for child in path {
            current = current.derive_child(*child)?;
        }
        Ok(current)
    }

    /// The public key at this node.
    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }

    /// The account address at this node.
    pub fn address(&self) -> Address {
        self.key.address()
    }
}

impl fmt::Debug for ExtendedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedPublicKey")
            .field("depth", &self.depth)
            .field("address", &self.address())
            .finish()
    }
}
