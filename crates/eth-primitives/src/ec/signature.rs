//! Recoverable ECDSA signatures in 65-byte `R || S || V` form.
//!
//! Supports RFC6979 deterministic signing, low-S normalization with recovery
//! id adjustment, address recovery, and verification against an expected
//! signer address. The recovery byte V stays in {0, 1}; chain-specific
//! offsets are a transaction-encoding concern, not handled here.

use k256::ecdsa::{self, RecoveryId, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::address::Address;
use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// Length of a serialized recoverable signature: 32-byte R, 32-byte S, 1-byte V.
pub const SIGNATURE_LEN: usize = 65;

/// The secp256k1 curve order N.
/// N = FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141
const CURVE_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFE, 0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36,
    0x41, 0x41,
];

/// Half of the secp256k1 curve order (N/2), used for low-S normalization.
const HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B,
    0x20, 0xA0,
];

/// A recoverable ECDSA signature over secp256k1.
///
/// The S component is always in the lower half of the curve order and the
/// recovery id V is 0 or 1, so the signer address can be recovered from the
/// signature and message hash alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoverableSignature {
    /// The R component of the signature (32 bytes, big-endian).
    r: [u8; 32],
    /// The S component of the signature (32 bytes, big-endian).
    s: [u8; 32],
    /// The recovery id, 0 or 1.
    v: u8,
}

impl RecoverableSignature {
    /// Sign a 32-byte message hash using RFC6979 deterministic nonces.
    ///
    /// The produced signature is low-S normalized; when normalization flips
    /// S, the recovery id is flipped with it so address recovery still
    /// succeeds.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte message hash to sign.
    /// * `priv_key` - The private key to sign with.
    ///
    /// # Returns
    /// `Ok(RecoverableSignature)` on success, or an error if signing fails.
    pub fn sign(hash: &[u8; 32], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let (k256_sig, recovery_id) = priv_key
            .signing_key()
            .sign_prehash_recoverable(hash)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        let (r_bytes, s_bytes) = k256_sig.split_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&r_bytes);
        s.copy_from_slice(&s_bytes);
        let mut v = recovery_id.to_byte() & 1;

        // Low-S normalization; flipping S negates the recovered y-parity.
        if is_greater_than(&s, &HALF_ORDER) {
            s = subtract_from_order(&s);
            v ^= 1;
        }

        Ok(RecoverableSignature { r, s, v })
    }

    /// Assemble a signature from raw components.
    ///
    /// # Arguments
    /// * `r` - The R component (32 bytes, big-endian).
    /// * `s` - The S component (32 bytes, big-endian).
    /// * `v` - The recovery id, 0 or 1.
    ///
    /// # Returns
    /// `Ok(RecoverableSignature)` or an error if a component is out of range.
    pub fn from_parts(r: [u8; 32], s: [u8; 32], v: u8) -> Result<Self, PrimitivesError> {
        if v > 1 {
            return Err(PrimitivesError::InvalidSignature(format!(
                "recovery id must be 0 or 1, got {}",
                v
            )));
        }
        if is_zero(&r) || !is_less_than(&r, &CURVE_ORDER) {
            return Err(PrimitivesError::InvalidSignature(
                "signature R out of range".to_string(),
            ));
        }
        if is_zero(&s) || !is_less_than(&s, &CURVE_ORDER) {
            return Err(PrimitivesError::InvalidSignature(
                "signature S out of range".to_string(),
            ));
        }
        Ok(RecoverableSignature { r, s, v })
    }

    /// Parse a 65-byte `R || S || V` signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(PrimitivesError::InvalidSignature(format!(
                "expected {} bytes, got {}",
                SIGNATURE_LEN,
                bytes.len()
            )));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Self::from_parts(r, s, bytes[64])
    }

    /// Serialize as 65 bytes: `R || S || V` with V in {0, 1}.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut out = [0u8; SIGNATURE_LEN];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    /// The R component.
    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// The S component.
    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// The recovery id (0 or 1).
    pub fn v(&self) -> u8 {
        self.v
    }

    /// Whether the S component is in the lower half of the curve order.
    pub fn is_low_s(&self) -> bool {
        !is_greater_than(&self.s, &HALF_ORDER)
    }

    /// Recover the signer's public key from the signature and message hash.
    pub fn recover_public_key(&self, hash: &[u8; 32]) -> Result<PublicKey, PrimitivesError> {
        let recovery_id = RecoveryId::from_byte(self.v).ok_or_else(|| {
            PrimitivesError::InvalidSignature(format!("invalid recovery id {}", self.v))
        })?;
        let k256_sig = ecdsa::Signature::from_scalars(
            k256::FieldBytes::from(self.r),
            k256::FieldBytes::from(self.s),
        )
        .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        let recovered = VerifyingKey::recover_from_prehash(hash, &k256_sig, recovery_id)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(PublicKey::from_bytes(
            recovered.to_encoded_point(false).as_bytes(),
        )?)
    }

    /// Recover the signer's account address from the signature and hash.
    pub fn recover_address(&self, hash: &[u8; 32]) -> Result<Address, PrimitivesError> {
        Ok(self.recover_public_key(hash)?.address())
    }

    /// Verify the signature against a message hash and expected signer.
    ///
    /// # Returns
    /// `true` iff the recovered address equals `expected`.
    pub fn verify(&self, hash: &[u8; 32], expected: &Address) -> bool {
        match self.recover_address(hash) {
            Ok(recovered) => recovered == *expected,
            Err(_) => false,
        }
    }
}

/// Check if a 32-byte big-endian integer is zero.
fn is_zero(val: &[u8; 32]) -> bool {
    val.iter().all(|&b| b == 0)
}

/// Compare two 32-byte big-endian integers: a < b.
fn is_less_than(a: &[u8; 32], b: &[u8; 32]) -> bool {
    for i in 0..32 {
        if a[i] < b[i] {
            return true;
        }
        if a[i] > b[i] {
            return false;
        }
    }
    false // equal
}

/// Compare two 32-byte big-endian integers: a > b.
fn is_greater_than(a: &[u8; 32], b: &[u8; 32]) -> bool {
    for i in 0..32 {
        if a[i] > b[i] {
            return true;
        }
        if a[i] < b[i] {
            return false;
        }
    }
    false // equal
}

/// Compute N - val where N is the secp256k1 curve order.
///
/// Used for low-S normalization.
fn subtract_from_order(val: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i32 = 0;
    for i in (0..32).rev() {
        let diff = CURVE_ORDER[i] as i32 - val[i] as i32 - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }
    result
}
