//! Integrity module — detect tampering of cached application files.
//!
//! This module provides:
//! - Resource fetchers for the live bytes (`fetch`)
//! - The manifest, its verification and the startup check (`manifest`)
//! - The host hooks used to remediate a failed check (`remediation`)

pub mod fetch;
pub mod manifest;
pub mod remediation;

#[cfg(feature = "http-fetch")]
pub use fetch::HttpFetcher;
pub use fetch::{DirFetcher, ResourceFetcher, StaticFetcher};
pub use manifest::{
    IntegrityChecker, IntegrityManifest, IntegrityReport, DEFAULT_TRACKED_FILES, MANIFEST_VERSION,
};
pub use remediation::{RemediationHost, StartupOutcome};
