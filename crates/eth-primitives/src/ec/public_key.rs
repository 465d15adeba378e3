//! secp256k1 public key with address derivation.
//!
//! Supports compressed/uncompressed SEC1 serialization and derivation of the
//! 20-byte account address from the uncompressed form.

use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::address::Address;
use crate::PrimitivesError;

/// Length of a compressed public key in bytes (prefix + 32 byte x-coordinate).
const COMPRESSED_LEN: usize = 33;

/// Length of an uncompressed public key in bytes (prefix + 32 byte x + 32 byte y).
const UNCOMPRESSED_LEN: usize = 65;

/// A secp256k1 public key.
///
/// Wraps a k256 `VerifyingKey` and provides SEC1 serialization and account
/// address derivation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    /// The underlying k256 verifying key.
    inner: VerifyingKey,
}

impl PublicKey {
    /// Create a PublicKey from raw SEC1 encoded bytes.
    ///
    /// Accepts both compressed (33-byte) and uncompressed (65-byte) formats.
    ///
    /// # Arguments
    /// * `bytes` - SEC1-encoded public key bytes.
    ///
    /// # Returns
    /// `Ok(PublicKey)` on success, or an error if the bytes don't represent a
    /// valid curve point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.is_empty() {
            return Err(PrimitivesError::InvalidPublicKey(
                "pubkey bytes are empty".to_string(),
            ));
        }
        let vk = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| PrimitivesError::InvalidPublicKey(e.to_string()))?;
        Ok(PublicKey { inner: vk })
    }

    /// Create a PublicKey from a hex-encoded SEC1 string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Wrap an existing k256 verifying key.
    pub(crate) fn from_verifying_key(vk: &VerifyingKey) -> Self {
        PublicKey { inner: *vk }
    }

    /// Serialize the public key in uncompressed SEC1 format (65 bytes).
    ///
    /// The first byte is the 0x04 format tag, followed by the 32-byte X and
    /// 32-byte Y coordinates.
    pub fn to_uncompressed(&self) -> [u8; UNCOMPRESSED_LEN] {
        let point = self.inner.to_encoded_point(false);
        let mut out = [0u8; UNCOMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Serialize the public key in compressed SEC1 format (33 bytes).
    pub fn to_compressed(&self) -> [u8; COMPRESSED_LEN] {
        let point = self.inner.to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Serialize the public key as a lowercase hex string (uncompressed form).
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_uncompressed())
    }

    /// Derive the account address for this public key.
    ///
    /// Address = last 20 bytes of Keccak-256 over the uncompressed encoding
    /// with the leading format byte excluded.
    pub fn address(&self) -> Address {
        Address::from_uncompressed_pubkey(&self.to_uncompressed())
    }

    /// Access the underlying k256 `VerifyingKey`.
    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::private_key::PrivateKey;

    #[test]
    fn test_sec1_round_trips() {
        let key = PrivateKey::generate_os().unwrap();
        let public = key.public_key();

        let uncompressed = public.to_uncompressed();
        assert_eq!(uncompressed[0], 0x04);
        assert_eq!(PublicKey::from_bytes(&uncompressed).unwrap(), public);

        let compressed = public.to_compressed();
        assert!(compressed[0] == 0x02 || compressed[0] == 0x03);
        assert_eq!(PublicKey::from_bytes(&compressed).unwrap(), public);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(PublicKey::from_bytes(&[]).is_err());
        assert!(PublicKey::from_bytes(&[0x04; 65]).is_err());
        assert!(PublicKey::from_hex("zz").is_err());
    }

    #[test]
    fn test_address_matches_private_key() {
        let key = PrivateKey::generate_os().unwrap();
        assert_eq!(key.public_key().address(), key.address());
    }

    #[test]
    fn test_known_generator_address() {
        // Public key of scalar 1 is the curve generator.
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        let key = PrivateKey::from_bytes(&bytes).unwrap();
        let public = key.public_key();
        assert_eq!(
            hex::encode(&public.to_uncompressed()[..]),
            "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
             483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
        );
        assert_eq!(
            public.address().to_lower_hex(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }
}
