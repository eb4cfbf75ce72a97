//! Content-hash baseline for cached application files.
//!
//! `generate` fetches every tracked path, hashes it with SHA-256 and stores
//! the result under `integrity.manifest`. `verify` re-fetches and compares.
//! The manifest is only ever changed by `generate` and `update_file_hash`;
//! verification never re-baselines anything on its own.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::fetch::ResourceFetcher;
use super::remediation::{RemediationHost, StartupOutcome};
use crate::crypto::{digest_eq, CryptoProvider};
use crate::errors::{Result, TrustVaultError};
use crate::storage::{KeyValueStore, MANIFEST_KEY};

/// Version string written into new manifests.
pub const MANIFEST_VERSION: &str = "1.0.0";

/// Files tracked when no explicit list is configured.
pub const DEFAULT_TRACKED_FILES: &[&str] = &[
    "/index.html",
    "/assets/index.js",
    "/assets/index.css",
    "/manifest.json",
    "/sw.js",
];

/// Persisted baseline: resource path → lowercase hex SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub version: String,
    /// Milliseconds since the Unix epoch of the last change.
    pub timestamp: i64,
    pub files: BTreeMap<String, String>,
}

/// Outcome of a verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub valid: bool,
    /// Paths whose live bytes differ from the baseline or could not be
    /// fetched, in manifest (sorted) order.
    pub corrupted_files: Vec<String>,
}

impl IntegrityReport {
    fn trusted() -> Self {
        Self {
            valid: true,
            corrupted_files: Vec::new(),
        }
    }
}

/// Generates, stores and checks the integrity manifest.
pub struct IntegrityChecker {
    store: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn ResourceFetcher>,
    crypto: Arc<dyn CryptoProvider>,
}

impl IntegrityChecker {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn ResourceFetcher>,
        crypto: Arc<dyn CryptoProvider>,
    ) -> Self {
        Self {
            store,
            fetcher,
            crypto,
        }
    }

    /// The persisted manifest, if any.
    ///
    /// A stored manifest that cannot be parsed is an error, not "absent":
    /// only a genuinely missing manifest earns the trust-by-default path.
    pub fn stored_manifest(&self) -> Result<Option<IntegrityManifest>> {
        let Some(raw) = self.store.get(MANIFEST_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| TrustVaultError::InvalidFormat(format!("integrity manifest: {e}")))
    }

    /// Hash every path and persist a fresh manifest.
    ///
    /// Any unreachable path aborts the whole operation and nothing is
    /// stored: a partial baseline would silently stop covering files.
    pub fn generate<S: AsRef<str>>(&self, paths: &[S]) -> Result<IntegrityManifest> {
        let mut files = BTreeMap::new();
        for path in paths {
            let path = path.as_ref();
            let hash = self.hash_resource(path).inspect_err(|e| {
                error!(path, error = %e, "integrity manifest generation failed");
            })?;
            debug!(path, hash = &hash[..16], "hashed");
            files.insert(path.to_string(), hash);
        }

        let manifest = IntegrityManifest {
            version: MANIFEST_VERSION.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            files,
        };
        self.persist(&manifest)?;

        info!(files = manifest.files.len(), "integrity manifest generated");
        Ok(manifest)
    }

    /// `generate` over `DEFAULT_TRACKED_FILES`.
    pub fn generate_default(&self) -> Result<IntegrityManifest> {
        self.generate(DEFAULT_TRACKED_FILES)
    }

    /// Re-hash every entry of `manifest` (or the stored one).
    ///
    /// With no manifest at all there is nothing to check and the result
    /// is `valid`. All entries are checked before returning.
    pub fn verify(&self, manifest: Option<&IntegrityManifest>) -> Result<IntegrityReport> {
        let stored;
        let manifest = match manifest {
            Some(m) => m,
            None => match self.stored_manifest()? {
                Some(m) => {
                    stored = m;
                    &stored
                }
                None => {
                    warn!("no integrity manifest found — nothing to verify");
                    return Ok(IntegrityReport::trusted());
                }
            },
        };

        let corrupted_files: Vec<String> = manifest
            .files
            .iter()
            .filter(|(path, expected)| !self.check_one(path, expected))
            .map(|(path, _)| path.clone())
            .collect();

        let report = IntegrityReport {
            valid: corrupted_files.is_empty(),
            corrupted_files,
        };
        if report.valid {
            info!(files = manifest.files.len(), "integrity check passed");
        } else {
            error!(corrupted = ?report.corrupted_files, "integrity check failed");
        }
        Ok(report)
    }

    /// Check a single path against the stored manifest.
    ///
    /// A path the manifest does not track is trusted; an unreachable
    /// tracked path is not.
    pub fn verify_file(&self, path: &str) -> Result<bool> {
        let Some(manifest) = self.stored_manifest()? else {
            return Ok(true);
        };
        match manifest.files.get(path) {
            Some(expected) => Ok(self.check_one(path, expected)),
            None => {
                warn!(path, "no baseline hash for file");
                Ok(true)
            }
        }
    }

    /// Re-baseline `path` after a legitimate content change.
    ///
    /// Adds the path if the manifest did not track it yet.
    pub fn update_file_hash(&self, path: &str) -> Result<IntegrityManifest> {
        let mut manifest = self
            .stored_manifest()?
            .ok_or(TrustVaultError::ManifestNotFound)?;

        let hash = self.hash_resource(path)?;
        manifest.files.insert(path.to_string(), hash);
        manifest.timestamp = Utc::now().timestamp_millis();
        self.persist(&manifest)?;

        info!(path, "integrity baseline updated");
        Ok(manifest)
    }

    /// Verify on startup and, on failure, run the full remediation.
    ///
    /// Remediation is all-or-nothing from the caller's view: the host is
    /// asked to confirm before any step runs. If it declines, the mismatch
    /// is returned as an `IntegrityMismatch` error rather than dropped.
    /// If it confirms, every step runs: background workers deregistered,
    /// caches cleared, all persisted state except the manifest erased and
    /// the application reloaded.
    pub fn startup_check(&self, host: &mut dyn RemediationHost) -> Result<StartupOutcome> {
        let report = self.verify(None)?;
        if report.valid {
            return Ok(StartupOutcome::Clean);
        }

        if !host.confirm(&report) {
            warn!("integrity remediation declined by host");
            return Err(TrustVaultError::IntegrityMismatch(format!(
                "corrupted files: {}",
                report.corrupted_files.join(", ")
            )));
        }

        self.remediate(host)?;
        Ok(StartupOutcome::Remediated(report))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn remediate(&self, host: &mut dyn RemediationHost) -> Result<()> {
        let manifest_raw = self.store.get(MANIFEST_KEY)?;
        let failed = |step: &str, e: TrustVaultError| {
            TrustVaultError::RemediationFailed(format!("{step}: {e}"))
        };

        let workers = host
            .unregister_workers()
            .map_err(|e| failed("unregister workers", e))?;
        let caches = host.clear_caches().map_err(|e| failed("clear caches", e))?;

        self.store
            .clear_except(&[MANIFEST_KEY])
            .map_err(|e| failed("clear local state", e))?;
        if let Some(raw) = manifest_raw {
            if self.store.get(MANIFEST_KEY)?.is_none() {
                self.store
                    .set(MANIFEST_KEY, &raw)
                    .map_err(|e| failed("restore manifest", e))?;
            }
        }

        warn!(workers, caches, "local state cleared after integrity failure");
        host.reload().map_err(|e| failed("reload", e))
    }

    fn hash_resource(&self, path: &str) -> Result<String> {
        let bytes = self.fetcher.fetch(path)?;
        Ok(self.crypto.hash_hex(&bytes))
    }

    /// `true` when `path` is reachable and hashes to `expected`.
    fn check_one(&self, path: &str, expected: &str) -> bool {
        match self.hash_resource(path) {
            Ok(actual) if digest_eq(expected, &actual) => {
                debug!(path, "integrity ok");
                true
            }
            Ok(actual) => {
                error!(path, expected, actual = %actual, "INTEGRITY VIOLATION");
                false
            }
            Err(e) => {
                error!(path, error = %e, "failed to verify file");
                false
            }
        }
    }

    fn persist(&self, manifest: &IntegrityManifest) -> Result<()> {
        let json = serde_json::to_string(manifest)
            .map_err(|e| TrustVaultError::SerializationError(format!("integrity manifest: {e}")))?;
        self.store.set(MANIFEST_KEY, &json)
    }
}
