//! Password-based key derivation.
//!
//! Two algorithms are supported:
//! - **PBKDF2-HMAC-SHA256** (default, 100 000 iterations), the scheme
//!   browsers expose natively and the one existing vaults were made with.
//! - **Argon2id**, a memory-hard alternative selectable in `.trustvault.toml`.
//!
//! The chosen algorithm and its cost parameters travel with every blob as a
//! short textual descriptor (see [`KdfParams::descriptor`]) so a vault always
//! re-opens with the exact settings it was created with.

use std::fmt;
use std::str::FromStr;

use argon2::{Algorithm, Argon2, Params, Version};
use hmac::Hmac;
use rand::RngCore;
use sha2::Sha256;

use super::keys::MasterKey;
use crate::errors::{Result, TrustVaultError};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Default PBKDF2 iteration count.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;

/// Lowest PBKDF2 iteration count we accept.
const MIN_PBKDF2_ITERATIONS: u32 = 1_000;

/// Highest PBKDF2 iteration count we accept.
const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;

/// Minimum safe Argon2 memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Argon2 memory ceiling in KiB (1 GB).
const MAX_MEMORY_KIB: u32 = 1_048_576;

/// Ceiling for both Argon2 passes and lanes.
const MAX_ARGON2_COST: u32 = 64;

/// Configurable Argon2id parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Which KDF to run, with its cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfParams {
    Pbkdf2Sha256 { iterations: u32 },
    Argon2id(Argon2Params),
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::Pbkdf2Sha256 {
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Textual form stored alongside ciphertext, e.g.
    /// `pbkdf2-sha256:i=100000` or `argon2id:m=65536,t=3,p=4`.
    pub fn descriptor(&self) -> String {
        self.to_string()
    }

    /// Reject parameters that would make derivation dangerously cheap, or
    /// so expensive that opening a blob would exhaust memory or CPU.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Pbkdf2Sha256 { iterations } => {
                within("PBKDF2 iterations", *iterations, MIN_PBKDF2_ITERATIONS, MAX_PBKDF2_ITERATIONS)
            }
            Self::Argon2id(p) => {
                within("Argon2 memory_kib", p.memory_kib, MIN_MEMORY_KIB, MAX_MEMORY_KIB)?;
                within("Argon2 iterations", p.iterations, 1, MAX_ARGON2_COST)?;
                within("Argon2 parallelism", p.parallelism, 1, MAX_ARGON2_COST)
            }
        }
    }
}

fn within(name: &str, value: u32, min: u32, max: u32) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(TrustVaultError::KeyDerivationFailed(format!(
            "{name} must be between {min} and {max} (got {value})"
        )))
    }
}

impl fmt::Display for KdfParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pbkdf2Sha256 { iterations } => write!(f, "pbkdf2-sha256:i={iterations}"),
            Self::Argon2id(p) => write!(
                f,
                "argon2id:m={},t={},p={}",
                p.memory_kib, p.iterations, p.parallelism
            ),
        }
    }
}

impl FromStr for KdfParams {
    type Err = TrustVaultError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || TrustVaultError::InvalidFormat(format!("unrecognised KDF descriptor '{s}'"));

        let (algorithm, params) = s.split_once(':').ok_or_else(bad)?;

        // Collect `k=v` pairs; every value is a u32.
        let mut fields = Vec::new();
        for pair in params.split(',') {
            let (k, v) = pair.split_once('=').ok_or_else(bad)?;
            let v: u32 = v.parse().map_err(|_| bad())?;
            fields.push((k, v));
        }
        let field = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| *v)
                .ok_or_else(bad)
        };

        let parsed = match algorithm {
            "pbkdf2-sha256" => Self::Pbkdf2Sha256 {
                iterations: field("i")?,
            },
            "argon2id" => Self::Argon2id(Argon2Params {
                memory_kib: field("m")?,
                iterations: field("t")?,
                parallelism: field("p")?,
            }),
            _ => return Err(bad()),
        };

        // A descriptor read from disk with out-of-range costs is a malformed
        // blob, not a derivation failure.
        parsed
            .validate()
            .map_err(|e| TrustVaultError::InvalidFormat(format!("KDF descriptor '{s}': {e}")))?;
        Ok(parsed)
    }
}

/// Derive a 32-byte master key from a passphrase and salt.
///
/// The same passphrase + salt + params always produce the same key.
pub fn derive_master_key(passphrase: &[u8], salt: &[u8], params: &KdfParams) -> Result<MasterKey> {
    params.validate()?;

    let mut key = [0u8; KEY_LEN];
    match params {
        KdfParams::Pbkdf2Sha256 { iterations } => {
            pbkdf2::pbkdf2::<Hmac<Sha256>>(passphrase, salt, *iterations, &mut key).map_err(
                |e| TrustVaultError::KeyDerivationFailed(format!("PBKDF2 failed: {e}")),
            )?;
        }
        KdfParams::Argon2id(p) => {
            let argon_params = Params::new(p.memory_kib, p.iterations, p.parallelism, Some(KEY_LEN))
                .map_err(|e| {
                    TrustVaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}"))
                })?;
            Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params)
                .hash_password_into(passphrase, salt, &mut key)
                .map_err(|e| {
                    TrustVaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}"))
                })?;
        }
    }

    // MasterKey takes a copy and zeroizes it on drop; wipe ours too.
    let master = MasterKey::new(key);
    zeroize::Zeroize::zeroize(&mut key);
    Ok(master)
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
