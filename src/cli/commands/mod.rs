//! One module per command family; each exposes `execute*` functions
//! called from `main`.

#[cfg(feature = "audit-log")]
pub mod audit_cmd;
pub mod backup;
pub mod cert;
pub mod completions;
pub mod integrity;
pub mod vault;
pub mod version;
