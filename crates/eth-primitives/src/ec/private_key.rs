//! secp256k1 private key for account signing.
//!
//! Wraps a k256 signing key and adds generation from an injected randomness
//! source, address derivation, and recoverable signing. Key bytes are
//! overwritten with zeros on drop.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::address::Address;
use crate::ec::public_key::PublicKey;
use crate::ec::signature::RecoverableSignature;
use crate::PrimitivesError;

/// Length of a serialized private key in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// Rejection-sampling attempts before the randomness source is declared
/// broken. A healthy source fails this with probability below 2^-3000.
const MAX_GENERATION_ATTEMPTS: usize = 128;

/// A secp256k1 private key for signing.
///
/// Wraps a k256 `SigningKey`. The scalar is held only inside this type and
/// zeroized when the key is dropped; callers are expected to keep the key
/// alive no longer than the operation that needs it.
#[derive(Clone)]
pub struct PrivateKey {
    /// The underlying k256 signing key.
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a private key from the supplied randomness source.
    ///
    /// Draws 32-byte candidates from `rng` and rejection-samples until one is
    /// a valid non-zero scalar on secp256k1. The source is injected so tests
    /// can supply deterministic streams; it is never cached or reused.
    ///
    /// # Arguments
    /// * `rng` - The randomness source to draw from.
    ///
    /// # Returns
    /// `Ok(PrivateKey)`, or `EntropyExhausted` if the source fails or never
    /// yields a valid scalar. That error is unrecoverable by policy: a source
    /// that cannot produce scalars cannot be trusted for any key.
    pub fn generate(rng: &mut dyn RngCore) -> Result<Self, PrimitivesError> {
        use zeroize::Zeroize;

        let mut candidate = [0u8; PRIVATE_KEY_BYTES_LEN];
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            rng.try_fill_bytes(&mut candidate).map_err(|e| {
                PrimitivesError::EntropyExhausted(e.to_string())
            })?;
            match SigningKey::from_bytes(&candidate.into()) {
                Ok(signing_key) => {
                    candidate.zeroize();
                    return Ok(PrivateKey { inner: signing_key });
                }
                Err(_) => continue, // zero or >= curve order, redraw
            }
        }
        candidate.zeroize();
        Err(PrimitivesError::EntropyExhausted(
            "randomness source produced no valid scalar".to_string(),
        ))
    }

    /// Generate a private key using the operating system RNG.
    pub fn generate_os() -> Result<Self, PrimitivesError> {
        Self::generate(&mut OsRng)
    }

    /// Create a private key from a raw 32-byte scalar.
    ///
    /// # Arguments
    /// * `bytes` - A 32-byte slice representing the private key scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` if the bytes represent a valid scalar on secp256k1,
    /// or an error if the scalar is zero or out of range.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }
        let signing_key = SigningKey::from_bytes(bytes.into())
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey { inner: signing_key })
    }

    /// Create a private key from a hexadecimal string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Serialize the private key as a 32-byte big-endian array.
    ///
    /// The returned array is a copy; callers holding it beyond the immediate
    /// operation are responsible for zeroizing it.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    /// Derive the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.inner.verifying_key())
    }

    /// Derive the account address for this key.
    ///
    /// Address = last 20 bytes of Keccak-256 over the uncompressed public key
    /// with its leading format byte excluded.
    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    /// Sign a 32-byte message hash, producing a recoverable signature.
    ///
    /// Uses RFC6979 deterministic nonces; the result is low-S normalized with
    /// the recovery id adjusted to match.
    pub fn sign_hash(&self, hash: &[u8; 32]) -> Result<RecoverableSignature, PrimitivesError> {
        RecoverableSignature::sign(hash, self)
    }

    /// Access the underlying k256 `SigningKey`.
    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never prints the scalar.
        f.debug_struct("PrivateKey")
            .field("address", &self.address())
            .finish()
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        // Overwrite the scalar's byte representation with zeros.
        let mut bytes = self.inner.to_bytes();
        bytes.zeroize();
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}
