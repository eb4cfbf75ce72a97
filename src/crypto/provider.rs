//! The cryptographic services handle passed into every subsystem.
//!
//! Subsystems never reach for the free functions in this module tree
//! directly; they hold an `Arc<dyn CryptoProvider>` handed to their
//! constructor. `SystemCrypto` is the production implementation. Tests
//! can wrap it to observe calls without ever touching raw key bytes.

use std::sync::Arc;

use rand::RngCore;

use super::keys::{AeadKey, MasterKey};
use super::{encryption, hash, kdf, signing};
use crate::errors::Result;

/// Primitive operations the trust layer needs from its host.
pub trait CryptoProvider: Send + Sync {
    /// `n` bytes from a cryptographically secure RNG.
    fn random_bytes(&self, n: usize) -> Vec<u8>;

    /// Stretch a passphrase into a master key.
    fn derive_key(&self, passphrase: &[u8], salt: &[u8], params: &kdf::KdfParams)
        -> Result<MasterKey>;

    /// AEAD-encrypt with a freshly sampled nonce; returns `nonce || ct || tag`.
    fn aead_encrypt(&self, key: &AeadKey, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>>;

    /// Inverse of `aead_encrypt`.
    fn aead_decrypt(&self, key: &AeadKey, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>>;

    /// SHA-256 digest.
    fn hash(&self, data: &[u8]) -> [u8; 32];

    /// New ephemeral ECDSA P-256 keypair.
    fn generate_signing_identity(&self) -> signing::SigningIdentity;

    /// Sign `message` with `identity`.
    fn sign(&self, identity: &signing::SigningIdentity, message: &[u8]) -> Vec<u8>;

    /// Verify a signature against a JWK public key.
    fn verify(&self, public_key: &serde_json::Value, message: &[u8], signature: &[u8])
        -> Result<bool>;

    /// Hex-encoded SHA-256 digest.
    fn hash_hex(&self, data: &[u8]) -> String {
        hex::encode(self.hash(data))
    }
}

/// Production provider backed by the RustCrypto crates.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCrypto;

impl SystemCrypto {
    /// Convenience constructor returning the shared handle form.
    pub fn shared() -> Arc<dyn CryptoProvider> {
        Arc::new(Self)
    }
}

impl CryptoProvider for SystemCrypto {
    fn random_bytes(&self, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        rand::rng().fill_bytes(&mut buf);
        buf
    }

    fn derive_key(
        &self,
        passphrase: &[u8],
        salt: &[u8],
        params: &kdf::KdfParams,
    ) -> Result<MasterKey> {
        kdf::derive_master_key(passphrase, salt, params)
    }

    fn aead_encrypt(&self, key: &AeadKey, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        encryption::encrypt(key, plaintext, aad)
    }

    fn aead_decrypt(&self, key: &AeadKey, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        encryption::decrypt(key, sealed, aad)
    }

    fn hash(&self, data: &[u8]) -> [u8; 32] {
        hash::sha256(data)
    }

    fn generate_signing_identity(&self) -> signing::SigningIdentity {
        signing::SigningIdentity::generate()
    }

    fn sign(&self, identity: &signing::SigningIdentity, message: &[u8]) -> Vec<u8> {
        identity.sign(message)
    }

    fn verify(
        &self,
        public_key: &serde_json::Value,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        signing::verify_signature(public_key, message, signature)
    }
}
