//! High-level vault lifecycle.
//!
//! `VaultStore` wraps the blob format and the crypto provider so that UI
//! code can work with simple calls like `vault.unlock("...")` and
//! `vault.save(data)`.
//!
//! ```text
//!   NonExistent ──create──▶ Unlocked ◀──unlock── Locked
//!        ▲                     │ lock ───────────▶ │
//!        └────────── destroy (from any state) ─────┘
//! ```
//!
//! Mutating methods take `&mut self`, so concurrent `save`/`unlock`/`lock`
//! on one instance cannot compile; callers serialize access themselves.

use std::sync::Arc;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::kdf::{KdfParams, SALT_LEN};
use crate::crypto::{digest_eq, AeadKey, CryptoProvider};
use crate::errors::{Result, TrustVaultError};
use crate::storage::{KeyValueStore, VAULT_BLOB_KEY, VAULT_VERIFIER_KEY};

use super::data::VaultData;
use super::format::VaultBlob;

/// Minimum passphrase length, in characters.
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// Where a vault is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    NonExistent,
    Locked,
    Unlocked,
}

/// Everything held in memory while the vault is unlocked.
struct Session {
    key: AeadKey,
    kdf: KdfParams,
    salt: [u8; SALT_LEN],
    data: VaultData,
}

/// Handle to the single vault kept in a `KeyValueStore`.
pub struct VaultStore {
    store: Arc<dyn KeyValueStore>,
    crypto: Arc<dyn CryptoProvider>,

    /// KDF settings used for new vaults and passphrase changes.
    /// Existing vaults always re-open with the settings in their blob.
    kdf: KdfParams,

    session: Option<Session>,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    pub fn new(store: Arc<dyn KeyValueStore>, crypto: Arc<dyn CryptoProvider>) -> Self {
        Self {
            store,
            crypto,
            kdf: KdfParams::default(),
            session: None,
        }
    }

    /// Use `kdf` for vaults created (or re-keyed) through this handle.
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    pub fn state(&self) -> Result<VaultState> {
        if self.session.is_some() {
            return Ok(VaultState::Unlocked);
        }
        if self.exists()? {
            Ok(VaultState::Locked)
        } else {
            Ok(VaultState::NonExistent)
        }
    }

    /// Returns `true` if a vault blob is persisted.
    pub fn exists(&self) -> Result<bool> {
        Ok(self.store.get(VAULT_BLOB_KEY)?.is_some())
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_some()
    }

    /// The decrypted record. Fails with `VaultLocked` unless unlocked.
    pub fn data(&self) -> Result<&VaultData> {
        self.session
            .as_ref()
            .map(|s| &s.data)
            .ok_or(TrustVaultError::VaultLocked)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create a brand-new vault holding `initial_data` and leave it unlocked.
    pub fn create(&mut self, passphrase: &str, initial_data: VaultData) -> Result<()> {
        check_passphrase_strength(passphrase)?;
        if self.exists()? {
            return Err(TrustVaultError::VaultAlreadyExists);
        }

        let (session, verifier) = self.new_session(passphrase, initial_data)?;
        self.persist(&session, Some(&verifier))?;
        self.session = Some(session);

        info!(kdf = %self.kdf, "vault created");
        Ok(())
    }

    /// Decrypt the persisted vault and return its record.
    ///
    /// Any failure leaves the handle locked and returns no data. Wrong
    /// passphrase and damaged blob are reported identically.
    pub fn unlock(&mut self, passphrase: &str) -> Result<VaultData> {
        let encoded = self
            .store
            .get(VAULT_BLOB_KEY)?
            .ok_or(TrustVaultError::VaultNotFound)?;

        // Drop any previous session before trying; a failed unlock must
        // not leave stale plaintext behind.
        self.session = None;

        match self.open_blob(&encoded, passphrase) {
            Ok(session) => {
                let data = session.data.clone();
                self.session = Some(session);
                info!("vault unlocked");
                Ok(data)
            }
            Err(e) => {
                warn!("vault unlock failed");
                debug!(error = %e, "unlock failure detail");
                Err(TrustVaultError::InvalidPassphraseOrCorruptedData)
            }
        }
    }

    /// Replace the vault contents with `data` and persist them.
    ///
    /// Re-encrypts under a freshly sampled nonce; the store swaps the
    /// blob atomically.
    pub fn save(&mut self, data: VaultData) -> Result<()> {
        let mut session = self.session.take().ok_or(TrustVaultError::VaultLocked)?;
        let previous = std::mem::replace(&mut session.data, data);

        let result = self.persist(&session, None);
        if result.is_err() {
            // Nothing new reached storage; keep memory consistent with it.
            session.data = previous;
        }
        self.session = Some(session);
        result?;

        debug!("vault saved");
        Ok(())
    }

    /// Forget the key and plaintext. The persisted blob is untouched.
    pub fn lock(&mut self) {
        if self.session.take().is_some() {
            info!("vault locked");
        }
    }

    /// Irreversibly erase the vault blob and its verifier.
    ///
    /// Callers are responsible for confirming with the user first.
    pub fn destroy(&mut self) -> Result<()> {
        self.session = None;
        // The blob goes first: once it is gone the vault is gone, even if
        // removing the verifier fails afterwards.
        self.store.remove(VAULT_BLOB_KEY)?;
        self.store.remove(VAULT_VERIFIER_KEY)?;
        warn!("vault destroyed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Passphrase helpers
    // ------------------------------------------------------------------

    /// Fast-fail passphrase check against the stored verifier.
    ///
    /// This is a UX hint only: `true` does not authenticate anything, and
    /// `unlock` always performs the full authenticated decrypt regardless.
    /// The verifier comes from the same KDF run as the real key, so this
    /// is no cheaper to brute-force than `unlock`.
    pub fn verify_passphrase(&self, passphrase: &str) -> Result<bool> {
        let (Some(encoded), Some(stored)) = (
            self.store.get(VAULT_BLOB_KEY)?,
            self.store.get(VAULT_VERIFIER_KEY)?,
        ) else {
            return Ok(false);
        };

        let Ok(blob) = VaultBlob::decode(&encoded) else {
            return Ok(false);
        };
        let master = self
            .crypto
            .derive_key(passphrase.as_bytes(), &blob.salt, &blob.kdf)?;
        Ok(digest_eq(stored.trim(), &master.verifier()?))
    }

    /// Re-key the unlocked vault under `new_passphrase` with a new salt.
    pub fn change_passphrase(&mut self, new_passphrase: &str) -> Result<()> {
        check_passphrase_strength(new_passphrase)?;
        let data = self.data()?.clone();

        let (session, verifier) = self.new_session(new_passphrase, data)?;
        self.persist(&session, Some(&verifier))?;
        self.session = Some(session);

        info!(kdf = %self.kdf, "vault passphrase changed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Fresh salt and key for `passphrase`, plus the matching verifier.
    /// Touches nothing in storage.
    fn new_session(&self, passphrase: &str, data: VaultData) -> Result<(Session, String)> {
        let salt: [u8; SALT_LEN] = self
            .crypto
            .random_bytes(SALT_LEN)
            .try_into()
            .map_err(|short: Vec<u8>| {
                TrustVaultError::KeyDerivationFailed(format!(
                    "crypto provider returned a {}-byte salt, expected {SALT_LEN}",
                    short.len()
                ))
            })?;

        let master = self
            .crypto
            .derive_key(passphrase.as_bytes(), &salt, &self.kdf)?;

        let session = Session {
            key: master.derive_aead_key()?,
            kdf: self.kdf,
            salt,
            data,
        };
        Ok((session, master.verifier()?))
    }

    /// Encrypt the session data and write the blob, then the verifier
    /// when one is given (create / re-key).
    fn persist(&self, session: &Session, verifier: Option<&str>) -> Result<()> {
        let plaintext = Zeroizing::new(
            serde_json::to_vec(&session.data)
                .map_err(|e| TrustVaultError::SerializationError(format!("vault data: {e}")))?,
        );

        let mut blob = VaultBlob {
            kdf: session.kdf,
            salt: session.salt,
            sealed: Vec::new(),
        };
        blob.sealed = self
            .crypto
            .aead_encrypt(&session.key, &plaintext, &blob.aad())?;

        self.store.set(VAULT_BLOB_KEY, &blob.encode())?;

        if let Some(verifier) = verifier {
            self.store.set(VAULT_VERIFIER_KEY, verifier)?;
        }
        Ok(())
    }

    fn open_blob(&self, encoded: &str, passphrase: &str) -> Result<Session> {
        let blob = VaultBlob::decode(encoded)?;
        let master = self
            .crypto
            .derive_key(passphrase.as_bytes(), &blob.salt, &blob.kdf)?;
        let key = master.derive_aead_key()?;

        let plaintext = Zeroizing::new(self.crypto.aead_decrypt(&key, &blob.sealed, &blob.aad())?);
        let data: VaultData = serde_json::from_slice(&plaintext)
            .map_err(|e| TrustVaultError::InvalidFormat(format!("vault payload: {e}")))?;

        Ok(Session {
            key,
            kdf: blob.kdf,
            salt: blob.salt,
            data,
        })
    }
}

/// Enforce the minimum passphrase length.
pub fn check_passphrase_strength(passphrase: &str) -> Result<()> {
    if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
        return Err(TrustVaultError::WeakPassphrase(MIN_PASSPHRASE_LEN));
    }
    Ok(())
}
