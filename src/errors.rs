use thiserror::Error;

/// All errors that can occur in TrustVault.
#[derive(Debug, Error)]
pub enum TrustVaultError {
    // --- Passphrase / crypto errors ---
    #[error("Passphrase is too weak — it must be at least {0} characters")]
    WeakPassphrase(usize),

    #[error("Invalid passphrase or corrupted data")]
    InvalidPassphraseOrCorruptedData,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault lifecycle errors ---
    #[error("No vault exists — create one first")]
    VaultNotFound,

    #[error("A vault already exists — destroy it before creating a new one")]
    VaultAlreadyExists,

    #[error("Vault is locked — unlock it first")]
    VaultLocked,

    // --- Envelope / manifest / certificate errors ---
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Corrupted archive: {0}")]
    CorruptedArchive(String),

    #[error("Integrity mismatch: {0}")]
    IntegrityMismatch(String),

    #[error("Failed to fetch '{path}': {reason}")]
    FetchError { path: String, reason: String },

    #[error("No integrity manifest has been generated")]
    ManifestNotFound,

    #[error("Malformed certificate: {0}")]
    MalformedCertificate(String),

    #[error("Remediation failed: {0}")]
    RemediationFailed(String),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Audit error: {0}")]
    AuditError(String),
}

impl TrustVaultError {
    /// Returns `true` for failures that mean "the bytes are not what was
    /// written", whichever layer noticed it first.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::IntegrityMismatch(_)
                | Self::CorruptedArchive(_)
                | Self::InvalidPassphraseOrCorruptedData
        )
    }
}

/// Convenience type alias for TrustVault results.
pub type Result<T> = std::result::Result<T, TrustVaultError>;
