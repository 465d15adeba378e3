/// Ethereum SDK - Cryptographic primitives, hashing, and key derivation.
///
/// This crate provides the foundational building blocks for the eth-sdk:
/// - Hash functions (Keccak-256, SHA-256, HMAC variants)
/// - 20-byte account addresses with EIP-55 checksum encoding
/// - Elliptic curve cryptography (secp256k1 keys, recoverable signatures)
/// - Hierarchical deterministic key derivation (BIP-32 paths and extended keys)

pub mod hash;
pub mod address;
pub mod ec;
pub mod bip32;

mod error;
pub use error::PrimitivesError;
