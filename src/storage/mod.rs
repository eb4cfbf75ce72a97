//! Persistent key-value storage collaborator.
//!
//! The trust layer owns exactly three logical keys:
//! - `vault.blob` — the encrypted vault (opaque string)
//! - `vault.verifierHash` — the fast-fail passphrase verifier (hex)
//! - `integrity.manifest` — the integrity baseline (JSON)
//!
//! Implementations must make `set` atomic per key: a reader sees either
//! the previous value or the new one, never a torn write.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::errors::Result;

/// Storage key of the encrypted vault blob.
pub const VAULT_BLOB_KEY: &str = "vault.blob";

/// Storage key of the passphrase verifier.
pub const VAULT_VERIFIER_KEY: &str = "vault.verifierHash";

/// Storage key of the integrity manifest.
pub const MANIFEST_KEY: &str = "integrity.manifest";

/// A string-to-string store with atomic per-key writes.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Every key currently present, in no particular order.
    fn keys(&self) -> Result<Vec<String>>;

    /// Remove every key except those listed in `keep`.
    fn clear_except(&self, keep: &[&str]) -> Result<()> {
        for key in self.keys()? {
            if !keep.contains(&key.as_str()) {
                self.remove(&key)?;
            }
        }
        Ok(())
    }
}
