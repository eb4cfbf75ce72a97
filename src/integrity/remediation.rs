//! Tamper response after a failed startup check.
//!
//! The checker decides *what* happens; the host decides *how*, because
//! only it knows what "background workers", "caches" and "reload" mean
//! in its runtime.

use super::manifest::IntegrityReport;
use crate::errors::Result;

/// Runtime hooks used by `IntegrityChecker::startup_check`.
pub trait RemediationHost {
    /// Ask the user (or policy) whether to proceed. Nothing has been
    /// changed when this is called.
    fn confirm(&mut self, report: &IntegrityReport) -> bool;

    /// Deregister background workers. Returns how many were removed.
    fn unregister_workers(&mut self) -> Result<usize>;

    /// Delete every cache the application owns. Returns how many.
    fn clear_caches(&mut self) -> Result<usize>;

    /// Force a full reload of the application.
    fn reload(&mut self) -> Result<()>;
}

/// What `startup_check` ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    /// Every tracked file matched (or there was no manifest).
    Clean,
    /// A mismatch was found and the full remediation ran.
    Remediated(IntegrityReport),
}
