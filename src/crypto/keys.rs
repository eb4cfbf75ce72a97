//! Key types and HKDF sub-key derivation.
//!
//! From the single master key the KDF produces we derive:
//! - The **vault key** that actually encrypts data (AES-256-GCM).
//! - The **passphrase verifier**, a fast-fail check value that is only as
//!   cheap to attack as the full KDF itself.
//!
//! Neither key type hands its raw bytes to code outside this crate.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use super::kdf::KEY_LEN;
use crate::errors::{Result, TrustVaultError};

const VAULT_KEY_INFO: &[u8] = b"trustvault-vault-key";
const VERIFIER_INFO: &[u8] = b"trustvault-passphrase-verifier";

/// A 32-byte master key straight out of the password KDF.
///
/// Zeroed on drop. Only useful as input to [`MasterKey::derive_aead_key`]
/// and [`MasterKey::verifier`].
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    pub(crate) fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Derive the symmetric key used for authenticated encryption.
    pub fn derive_aead_key(&self) -> Result<AeadKey> {
        hkdf_derive(&self.bytes, VAULT_KEY_INFO).map(AeadKey::new)
    }

    /// Derive the hex passphrase verifier stored next to a vault.
    pub fn verifier(&self) -> Result<String> {
        let mut bytes = hkdf_derive(&self.bytes, VERIFIER_INFO)?;
        let encoded = hex::encode(bytes);
        bytes.zeroize();
        Ok(encoded)
    }
}

/// A non-extractable AES-256-GCM key.
///
/// There is no public accessor for the bytes; the key can only
/// be handed back to a [`CryptoProvider`](super::CryptoProvider).
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct AeadKey {
    bytes: [u8; KEY_LEN],
}

impl AeadKey {
    pub(crate) fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for AeadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AeadKey(<redacted>)")
    }
}

/// HKDF-SHA256 expand with the master key as IKM.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| TrustVaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}
