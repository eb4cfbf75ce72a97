//! Serialized vault blob format.
//!
//! A vault is persisted as one opaque string:
//!
//! ```text
//! <kdf descriptor>$<base64( salt: 16 | nonce: 12 | ciphertext + tag )>
//! ```
//!
//! - **KDF descriptor**: e.g. `pbkdf2-sha256:i=100000`; tells `unlock` how
//!   to re-derive the key. It is also fed to AES-GCM as associated data, so
//!   editing it is caught by the tag check as well as by the changed key.
//! - **Salt**: random per vault and per passphrase change.
//! - **Nonce + ciphertext + tag**: exactly what `CryptoProvider::aead_encrypt`
//!   returns. A new nonce is sampled on every save.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::crypto::encryption::{NONCE_LEN, TAG_LEN};
use crate::crypto::kdf::{KdfParams, SALT_LEN};
use crate::errors::{Result, TrustVaultError};

/// Separator between the KDF descriptor and the binary part.
const SEPARATOR: char = '$';

/// Parsed form of the persisted vault string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultBlob {
    pub kdf: KdfParams,
    pub salt: [u8; SALT_LEN],
    /// `nonce || ciphertext || tag`.
    pub sealed: Vec<u8>,
}

impl VaultBlob {
    /// The 12-byte nonce used for the current ciphertext.
    pub fn nonce(&self) -> &[u8] {
        &self.sealed[..NONCE_LEN.min(self.sealed.len())]
    }

    /// Associated data bound to the ciphertext.
    pub fn aad(&self) -> Vec<u8> {
        self.kdf.descriptor().into_bytes()
    }

    pub fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(SALT_LEN + self.sealed.len());
        raw.extend_from_slice(&self.salt);
        raw.extend_from_slice(&self.sealed);
        format!("{}{SEPARATOR}{}", self.kdf.descriptor(), BASE64.encode(raw))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let (descriptor, body) = encoded
            .trim()
            .split_once(SEPARATOR)
            .ok_or_else(|| TrustVaultError::InvalidFormat("vault blob has no KDF descriptor".into()))?;

        let kdf: KdfParams = descriptor.parse()?;

        let raw = BASE64
            .decode(body)
            .map_err(|e| TrustVaultError::InvalidFormat(format!("vault blob base64: {e}")))?;

        if raw.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
            return Err(TrustVaultError::InvalidFormat(
                "vault blob too small to be valid".into(),
            ));
        }

        let (salt_bytes, sealed) = raw.split_at(SALT_LEN);
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(salt_bytes);

        Ok(Self {
            kdf,
            salt,
            sealed: sealed.to_vec(),
        })
    }
}
