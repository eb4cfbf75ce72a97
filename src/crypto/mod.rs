//! Cryptographic primitives for TrustVault.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - PBKDF2 / Argon2id password-based key derivation (`kdf`)
//! - HKDF-derived vault keys and passphrase verifiers (`keys`)
//! - SHA-256 digests (`hash`)
//! - ECDSA P-256 certificate signatures (`signing`)
//! - The `CryptoProvider` services handle tying them together (`provider`)

pub mod encryption;
pub mod hash;
pub mod kdf;
pub mod keys;
pub mod provider;
pub mod signing;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{CryptoProvider, SystemCrypto, KdfParams, ...};
pub use hash::{digest_eq, sha256_hex};
pub use kdf::{generate_salt, Argon2Params, KdfParams};
pub use keys::{AeadKey, MasterKey};
pub use provider::{CryptoProvider, SystemCrypto};
pub use signing::SigningIdentity;
