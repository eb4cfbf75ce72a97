//! Backup module — checksummed, compressed, portable exports.
//!
//! See `envelope` for the file format.

pub mod envelope;

pub use envelope::{
    canonical_json, BackupArchiver, BackupEnvelope, BackupMeta, SealInfo, BACKUP_HEADER,
    DEFAULT_MAX_PAYLOAD_BYTES, FORMAT_VERSION,
};
