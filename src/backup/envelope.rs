//! Portable backup envelope.
//!
//! A backup file is pretty-printed JSON:
//!
//! ```text
//! {
//!   "header":  "TDC_BKP_V2",
//!   "meta":    { "version": "2.0", "timestamp": <epoch ms>,
//!                "checksum": <hex sha256 of the uncompressed JSON>,
//!                "appVersion": "..." , "encryption"?: { "kdf", "salt" } },
//!   "payload": base64( gzip( canonical JSON ) )
//! }
//! ```
//!
//! The checksum always covers the *uncompressed* canonical JSON bytes. On
//! restore it is recomputed over the decompressed bytes before anything is
//! JSON-parsed, so damage is reported as an integrity failure and never as
//! a confusing parse error or, worse, a silently different value.
//!
//! Backups are not secret by default. When built with a passphrase, the
//! compressed bytes are additionally sealed with AES-256-GCM and `payload`
//! holds `base64(nonce || ciphertext || tag)`.

use std::io::{Read, Write};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use zeroize::Zeroizing;

use crate::crypto::kdf::{KdfParams, SALT_LEN};
use crate::crypto::{digest_eq, CryptoProvider};
use crate::errors::{Result, TrustVaultError};

/// Constant format marker at the top of every backup.
pub const BACKUP_HEADER: &str = "TDC_BKP_V2";

/// Envelope format version written into `meta.version`.
pub const FORMAT_VERSION: &str = "2.0";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Default upper bound on the decompressed payload (64 MB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 64 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Passphrase layer parameters, present only on encrypted backups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealInfo {
    /// KDF descriptor, e.g. `pbkdf2-sha256:i=100000`.
    pub kdf: String,
    /// Base64 salt.
    pub salt: String,
}

/// Envelope metadata. Unknown fields are ignored on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMeta {
    pub version: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Hex SHA-256 of the uncompressed canonical JSON.
    pub checksum: String,
    pub app_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<SealInfo>,
}

/// A complete backup, ready to be written to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEnvelope {
    pub header: String,
    pub meta: BackupMeta,
    pub payload: String,
}

impl BackupEnvelope {
    /// Pretty-printed JSON form written to backup files.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TrustVaultError::SerializationError(format!("backup envelope: {e}")))
    }

    /// Parse raw file bytes and check the header. Nothing else is
    /// verified here.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let envelope: BackupEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| TrustVaultError::InvalidFormat(format!("backup is not valid JSON: {e}")))?;

        if envelope.header != BACKUP_HEADER {
            return Err(TrustVaultError::InvalidFormat(
                "not a backup file (header mismatch)".into(),
            ));
        }
        Ok(envelope)
    }

    pub fn is_encrypted(&self) -> bool {
        self.meta.encryption.is_some()
    }
}

// ---------------------------------------------------------------------------
// Builder / restorer
// ---------------------------------------------------------------------------

/// Builds and restores backup envelopes.
pub struct BackupArchiver {
    crypto: Arc<dyn CryptoProvider>,
    app_version: String,
    max_payload_bytes: u64,
    kdf: KdfParams,
}

impl BackupArchiver {
    pub fn new(crypto: Arc<dyn CryptoProvider>) -> Self {
        Self {
            crypto,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            kdf: KdfParams::default(),
        }
    }

    /// Version string recorded in `meta.appVersion`.
    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = app_version.into();
        self
    }

    /// Refuse payloads that inflate beyond `bytes`.
    pub fn with_max_payload_bytes(mut self, bytes: u64) -> Self {
        self.max_payload_bytes = bytes;
        self
    }

    /// KDF used for the optional passphrase layer.
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// Build a plain (integrity-checked, not encrypted) backup of `data`.
    pub fn build<T: Serialize + ?Sized>(&self, data: &T) -> Result<BackupEnvelope> {
        self.build_inner(data, None)
    }

    /// Build a backup whose payload is also sealed under `passphrase`.
    pub fn build_encrypted<T: Serialize + ?Sized>(
        &self,
        data: &T,
        passphrase: &str,
    ) -> Result<BackupEnvelope> {
        crate::vault::check_passphrase_strength(passphrase)?;
        self.build_inner(data, Some(passphrase))
    }

    /// Restore a plain backup from the raw file bytes.
    pub fn restore(&self, bytes: &[u8]) -> Result<serde_json::Value> {
        self.restore_with(bytes, None)
    }

    /// Restore a backup, supplying the passphrase if it is encrypted.
    ///
    /// Nothing is returned unless every check passes.
    pub fn restore_with(&self, bytes: &[u8], passphrase: Option<&str>) -> Result<serde_json::Value> {
        let envelope = BackupEnvelope::parse(bytes)?;

        let decoded = BASE64
            .decode(envelope.payload.trim())
            .map_err(|e| TrustVaultError::CorruptedArchive(format!("payload base64: {e}")))?;

        let compressed = match &envelope.meta.encryption {
            None => decoded,
            Some(seal) => {
                let passphrase = passphrase.ok_or_else(|| {
                    TrustVaultError::InvalidFormat(
                        "backup is encrypted — a passphrase is required".into(),
                    )
                })?;
                self.unseal(&envelope.meta, seal, &decoded, passphrase)?
            }
        };

        let json_bytes = Zeroizing::new(self.decompress(&compressed)?);

        let actual = self.crypto.hash_hex(&json_bytes);
        if !digest_eq(&envelope.meta.checksum, &actual) {
            error!(
                expected = %envelope.meta.checksum,
                actual = %actual,
                "backup checksum mismatch"
            );
            return Err(TrustVaultError::IntegrityMismatch(
                "backup checksum does not match its contents".into(),
            ));
        }

        let value = serde_json::from_slice(&json_bytes)
            .map_err(|e| TrustVaultError::InvalidFormat(format!("backup contents: {e}")))?;

        info!(
            version = %envelope.meta.version,
            app_version = %envelope.meta.app_version,
            encrypted = envelope.is_encrypted(),
            "backup restored"
        );
        Ok(value)
    }

    /// `restore_with`, then deserialize into `T`.
    pub fn restore_as<T: DeserializeOwned>(&self, bytes: &[u8], passphrase: Option<&str>) -> Result<T> {
        let value = self.restore_with(bytes, passphrase)?;
        serde_json::from_value(value)
            .map_err(|e| TrustVaultError::InvalidFormat(format!("backup contents: {e}")))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn build_inner<T: Serialize + ?Sized>(
        &self,
        data: &T,
        passphrase: Option<&str>,
    ) -> Result<BackupEnvelope> {
        let json_bytes = Zeroizing::new(canonical_json(data)?);

        // Checksum over the uncompressed bytes, before compression.
        let checksum = self.crypto.hash_hex(&json_bytes);
        let compressed = compress(&json_bytes)?;

        let mut meta = BackupMeta {
            version: FORMAT_VERSION.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            checksum,
            app_version: self.app_version.clone(),
            encryption: None,
        };

        let payload_bytes = match passphrase {
            None => compressed,
            Some(passphrase) => {
                let salt = self.crypto.random_bytes(SALT_LEN);
                let seal = SealInfo {
                    kdf: self.kdf.descriptor(),
                    salt: BASE64.encode(&salt),
                };
                let key = self
                    .crypto
                    .derive_key(passphrase.as_bytes(), &salt, &self.kdf)?
                    .derive_aead_key()?;
                let sealed = self
                    .crypto
                    .aead_encrypt(&key, &compressed, &seal_aad(&meta.checksum, &seal))?;
                meta.encryption = Some(seal);
                sealed
            }
        };

        debug!(
            plain_bytes = json_bytes.len(),
            payload_bytes = payload_bytes.len(),
            "backup built"
        );

        Ok(BackupEnvelope {
            header: BACKUP_HEADER.to_string(),
            meta,
            payload: BASE64.encode(payload_bytes),
        })
    }

    fn unseal(
        &self,
        meta: &BackupMeta,
        seal: &SealInfo,
        sealed: &[u8],
        passphrase: &str,
    ) -> Result<Vec<u8>> {
        let kdf: KdfParams = seal.kdf.parse()?;
        let salt = BASE64
            .decode(&seal.salt)
            .map_err(|e| TrustVaultError::InvalidFormat(format!("encryption salt: {e}")))?;

        let key = self
            .crypto
            .derive_key(passphrase.as_bytes(), &salt, &kdf)?
            .derive_aead_key()?;
        self.crypto
            .aead_decrypt(&key, sealed, &seal_aad(&meta.checksum, seal))
    }

    /// A payload that is not gzip at all is a corrupted archive; a gzip
    /// stream that fails to inflate or fails its CRC was altered in transit.
    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        if !compressed.starts_with(&GZIP_MAGIC) {
            return Err(TrustVaultError::CorruptedArchive(
                "payload is not a gzip stream".into(),
            ));
        }

        let mut out = Vec::new();
        GzDecoder::new(compressed)
            .take(self.max_payload_bytes + 1)
            .read_to_end(&mut out)
            .map_err(|e| TrustVaultError::IntegrityMismatch(format!("backup payload damaged: {e}")))?;

        if out.len() as u64 > self.max_payload_bytes {
            return Err(TrustVaultError::CorruptedArchive(format!(
                "payload inflates beyond {} bytes",
                self.max_payload_bytes
            )));
        }
        Ok(out)
    }
}

/// Serialize `data` with object keys in sorted order.
///
/// Going through `serde_json::Value` sorts every map, so equal data always
/// produces byte-identical JSON regardless of the source map type.
pub fn canonical_json<T: Serialize + ?Sized>(data: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(data)
        .map_err(|e| TrustVaultError::SerializationError(format!("backup data: {e}")))?;
    serde_json::to_vec(&value)
        .map_err(|e| TrustVaultError::SerializationError(format!("backup data: {e}")))
}

fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| TrustVaultError::SerializationError(format!("compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| TrustVaultError::SerializationError(format!("compression failed: {e}")))
}

/// Associated data binding the ciphertext to the envelope it came in.
fn seal_aad(checksum: &str, seal: &SealInfo) -> Vec<u8> {
    format!("{BACKUP_HEADER}|{checksum}|{}|{}", seal.kdf, seal.salt).into_bytes()
}
