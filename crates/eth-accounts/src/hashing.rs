//! Signing-hash constructions for each supported mimetype.
//!
//! Every scheme domain-separates its input with a `0x19`-prefixed tag so a
//! signature produced under one scheme can never validate under another, and
//! none of them can collide with a transaction signing hash. The byte layouts
//! here are relied on by other systems for signature verification and must be
//! reproduced exactly.

use eth_primitives::address::Address;
use eth_primitives::hash::{keccak256, keccak256_concat};

use crate::account::{
    MIMETYPE_CLIQUE, MIMETYPE_DATA_WITH_VALIDATOR, MIMETYPE_TEXT_PLAIN, MIMETYPE_TYPED_DATA,
};
use crate::AccountsError;

/// Prefix applied to personal messages before hashing.
const TEXT_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n";

/// Compute the personal-message hash of arbitrary data.
///
/// The preimage is the literal byte `0x19`, the ASCII text
/// `Ethereum Signed Message:\n`, the decimal byte length of the raw input
/// (ASCII digits, no padding), and the input itself.
pub fn text_hash(data: &[u8]) -> [u8; 32] {
    text_and_hash(data).0
}

/// Compute the personal-message hash and return the exact preimage with it.
///
/// The preimage is returned as bytes: the input need not be valid UTF-8.
pub fn text_and_hash(data: &[u8]) -> ([u8; 32], Vec<u8>) {
    let length = data.len().to_string();
    let mut msg = Vec::with_capacity(TEXT_PREFIX.len() + length.len() + data.len());
    msg.extend_from_slice(TEXT_PREFIX);
    msg.extend_from_slice(length.as_bytes());
    msg.extend_from_slice(data);
    (keccak256(&msg), msg)
}

/// Compute the typed structured-data hash.
///
/// Preimage: `0x19 || 0x01 || domain_separator || struct_hash`. Producing the
/// two 32-byte inputs from a typed-data document is the caller's concern.
pub fn typed_data_hash(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    keccak256_concat(&[&[0x19, 0x01], domain_separator, struct_hash])
}

/// Compute the validator-bound data hash.
///
/// Preimage: `0x19 || 0x00 || validator_address || data`.
pub fn validator_hash(validator: &Address, data: &[u8]) -> [u8; 32] {
    keccak256_concat(&[&[0x19, 0x00], validator.as_bytes(), data])
}

/// Compute the signing hash of a clique-style block header.
///
/// The input is the header already encoded with its signature field excluded;
/// that encoding is the caller's concern.
pub fn clique_header_hash(encoded_header: &[u8]) -> [u8; 32] {
    keccak256(encoded_header)
}

/// Dispatch to the hash construction declared by `mimetype`.
///
/// Input layout per mimetype:
/// - `text/plain`: the raw message bytes.
/// - `data/typed`: exactly 64 bytes, `domain_separator || struct_hash`.
/// - `data/validator`: 20-byte validator address followed by the payload.
/// - `application/x-clique-header`: the encoded header bytes.
///
/// # Returns
/// The 32-byte signing hash, or `Encoding` for an unknown mimetype or an
/// input that does not match the declared layout.
pub fn hash_for_mimetype(mimetype: &str, data: &[u8]) -> Result<[u8; 32], AccountsError> {
    match mimetype {
        MIMETYPE_TEXT_PLAIN => Ok(text_hash(data)),
        MIMETYPE_TYPED_DATA => {
            if data.len() != 64 {
                return Err(AccountsError::Encoding(format!(
                    "typed data input must be 64 bytes (domain separator and struct hash), got {}",
                    data.len()
                )));
            }
            let mut domain = [0u8; 32];
            let mut structure = [0u8; 32];
            domain.copy_from_slice(&data[..32]);
            structure.copy_from_slice(&data[32..]);
            Ok(typed_data_hash(&domain, &structure))
        }
        MIMETYPE_DATA_WITH_VALIDATOR => {
            if data.len() < 20 {
                return Err(AccountsError::Encoding(
                    "validator data must start with a 20-byte address".to_string(),
                ));
            }
            let validator = Address::from_slice(&data[..20])?;
            Ok(validator_hash(&validator, &data[20..]))
        }
        MIMETYPE_CLIQUE => Ok(clique_header_hash(data)),
        other => Err(AccountsError::Encoding(format!(
            "unsupported mimetype: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_hash_golden_vector() {
        // The 5-byte message "hello" hashes the exact preimage below.
        let expected = keccak256(b"\x19Ethereum Signed Message:\n5hello");
        assert_eq!(text_hash(b"hello"), expected);
    }

    #[test]
    fn test_text_preimage_layout() {
        let (_, msg) = text_and_hash(b"hello");
        assert_eq!(msg, b"\x19Ethereum Signed Message:\n5hello");

        // Length counts raw bytes, rendered in decimal without padding.
        let (_, msg) = text_and_hash(&[0u8; 12]);
        assert!(msg.starts_with(b"\x19Ethereum Signed Message:\n12"));

        let (_, msg) = text_and_hash(b"");
        assert_eq!(msg, b"\x19Ethereum Signed Message:\n0");
    }

    #[test]
    fn test_text_hash_non_utf8_input() {
        let data = [0xff, 0xfe, 0x00, 0x80];
        let (hash, msg) = text_and_hash(&data);
        assert!(msg.ends_with(&data));
        assert_eq!(hash, keccak256(&msg));
    }

    #[test]
    fn test_typed_data_hash_layout() {
        let domain = [0x11u8; 32];
        let structure = [0x22u8; 32];
        let mut preimage = vec![0x19, 0x01];
        preimage.extend_from_slice(&domain);
        preimage.extend_from_slice(&structure);
        assert_eq!(typed_data_hash(&domain, &structure), keccak256(&preimage));
    }

    #[test]
    fn test_validator_hash_layout() {
        let validator = Address::new([0xabu8; 20]);
        let data = b"payload";
        let mut preimage = vec![0x19, 0x00];
        preimage.extend_from_slice(validator.as_bytes());
        preimage.extend_from_slice(data);
        assert_eq!(validator_hash(&validator, data), keccak256(&preimage));
    }

    #[test]
    fn test_schemes_are_domain_separated() {
        // Identical payload bytes must hash differently under each scheme.
        let payload = [0x33u8; 64];
        let text = hash_for_mimetype(MIMETYPE_TEXT_PLAIN, &payload).unwrap();
        let typed = hash_for_mimetype(MIMETYPE_TYPED_DATA, &payload).unwrap();
        let clique = hash_for_mimetype(MIMETYPE_CLIQUE, &payload).unwrap();
        assert_ne!(text, typed);
        assert_ne!(text, clique);
        assert_ne!(typed, clique);
    }

    #[test]
    fn test_dispatch_rejects_bad_inputs() {
        assert!(hash_for_mimetype("application/unknown", b"x").is_err());
        assert!(hash_for_mimetype(MIMETYPE_TYPED_DATA, &[0u8; 63]).is_err());
        assert!(hash_for_mimetype(MIMETYPE_DATA_WITH_VALIDATOR, &[0u8; 19]).is_err());
    }
}
