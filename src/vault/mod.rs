//! Vault module — passphrase-protected storage of user state.
//!
//! This module provides:
//! - The `VaultData` record the vault protects (`data`)
//! - The serialized blob layout (`format`)
//! - The `VaultStore` lifecycle: create, unlock, save, lock, destroy (`store`)

pub mod data;
pub mod format;
pub mod store;

// Re-export the most commonly used items.
pub use data::VaultData;
pub use format::VaultBlob;
pub use store::{check_passphrase_strength, VaultState, VaultStore, MIN_PASSPHRASE_LEN};
