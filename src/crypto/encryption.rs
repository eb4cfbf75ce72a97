//! AES-256-GCM authenticated encryption.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce and
//! prepends it to the ciphertext.  `decrypt` splits the nonce back out
//! before decrypting.
//!
//! Layout of the returned byte buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use super::keys::AeadKey;
use crate::errors::{Result, TrustVaultError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` under `key`, authenticating `aad` alongside it.
///
/// Returns the nonce prepended to the ciphertext (nonce || ciphertext || tag).
pub fn encrypt(key: &AeadKey, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| TrustVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    // A new nonce for every call; callers never supply one.
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, Payload { msg: plaintext, aad })
        .map_err(|e| TrustVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt data that was produced by `encrypt`.
///
/// Wrong key, wrong `aad`, truncation and bit flips all produce the same
/// `InvalidPassphraseOrCorruptedData` error.
pub fn decrypt(key: &AeadKey, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(TrustVaultError::InvalidPassphraseOrCorruptedData);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| TrustVaultError::InvalidPassphraseOrCorruptedData)?;

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad })
        .map_err(|_| TrustVaultError::InvalidPassphraseOrCorruptedData)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> AeadKey {
        AeadKey::new([byte; 32])
    }

    #[test]
    fn roundtrip_with_aad() {
        let k = key(0xAB);
        let sealed = encrypt(&k, b"progress", b"ctx").unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + 8 + TAG_LEN);
        assert_eq!(decrypt(&k, &sealed, b"ctx").unwrap(), b"progress");
    }

    #[test]
    fn wrong_aad_is_rejected() {
        let k = key(0x01);
        let sealed = encrypt(&k, b"data", b"ctx-a").unwrap();
        assert!(matches!(
            decrypt(&k, &sealed, b"ctx-b"),
            Err(TrustVaultError::InvalidPassphraseOrCorruptedData)
        ));
    }

    #[test]
    fn truncated_input_is_rejected() {
        assert!(matches!(
            decrypt(&key(0x02), &[0u8; NONCE_LEN + TAG_LEN - 1], b""),
            Err(TrustVaultError::InvalidPassphraseOrCorruptedData)
        ));
    }
}
