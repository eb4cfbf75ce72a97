//! Audit log — local operation history.
//!
//! Every vault, backup, integrity and certificate operation the CLI runs is
//! appended to `<data_dir>/audit.db` with its outcome, so rejected restores,
//! failed unlocks and corrupted-file reports can be reviewed later.
//!
//! Logging never fails the operation being logged. With the `audit-log`
//! feature off, `log_audit` is a no-op.

#[cfg(feature = "audit-log")]
mod db;
mod event;

#[cfg(feature = "audit-log")]
pub use db::{AuditEntry, AuditFilter, AuditLog};
pub use event::{Family, Outcome};

use std::path::Path;

#[cfg(feature = "audit-log")]
pub fn log_audit(
    data_dir: &Path,
    operation: &str,
    outcome: Outcome,
    target: Option<&str>,
    details: Option<&str>,
) {
    if let Some(log) = AuditLog::open(data_dir) {
        log.record(operation, outcome, target, details);
    }
}

#[cfg(not(feature = "audit-log"))]
pub fn log_audit(
    _data_dir: &Path,
    _operation: &str,
    _outcome: Outcome,
    _target: Option<&str>,
    _details: Option<&str>,
) {
}
