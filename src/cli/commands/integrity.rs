//! `trustvault integrity` — baseline and verify tracked application files.
//!
//! Subcommands:
//! - `trustvault integrity generate`    — hash tracked files, store manifest
//! - `trustvault integrity verify`      — compare against the manifest
//! - `trustvault integrity update PATH` — re-baseline one file
//! - `trustvault integrity check [-y]`  — verify, remediate on failure

use std::fs;
use std::path::PathBuf;

use console::style;
use tracing::debug;

use crate::audit::Outcome;
use crate::cli::output;
use crate::cli::{confirm, Cli, Context};
use crate::config::Settings;
use crate::errors::{Result, TrustVaultError};
use crate::integrity::{IntegrityReport, RemediationHost, StartupOutcome};

/// Execute `trustvault integrity generate`.
pub fn execute_generate(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let manifest = ctx
        .integrity()?
        .generate(ctx.settings.tracked_files.as_slice())
        .inspect_err(|e| {
            ctx.audit("integrity-generate", Outcome::Failed, None, Some(&e.to_string()));
        })?;

    ctx.audit(
        "integrity-generate",
        Outcome::Ok,
        None,
        Some(&format!("{} files", manifest.files.len())),
    );
    output::print_manifest_table(&manifest);
    output::success(&format!(
        "Integrity manifest stored ({} files)",
        manifest.files.len()
    ));
    Ok(())
}

/// Execute `trustvault integrity verify`.
pub fn execute_verify(cli: &Cli, json: bool) -> Result<()> {
    let ctx = Context::load(cli)?;
    let checker = ctx.integrity()?;
    let has_manifest = checker.stored_manifest()?.is_some();
    let report = checker.verify(None)?;

    ctx.audit(
        "integrity-verify",
        outcome_of(&report),
        corrupted_target(&report).as_deref(),
        Some(&summary(&report)),
    );

    if json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| TrustVaultError::SerializationError(format!("report: {e}")))?;
        println!("{text}");
    } else if !has_manifest {
        output::warning("No integrity manifest yet — nothing to verify.");
        output::tip("Run `trustvault integrity generate` to create a baseline.");
    } else if report.valid {
        output::success("All tracked files match the manifest.");
    } else {
        output::print_corrupted_files(&report.corrupted_files);
    }

    if report.valid {
        Ok(())
    } else {
        Err(TrustVaultError::IntegrityMismatch(summary(&report)))
    }
}

/// Execute `trustvault integrity update`.
pub fn execute_update(cli: &Cli, path: &str) -> Result<()> {
    let ctx = Context::load(cli)?;
    ctx.integrity()?.update_file_hash(path)?;

    ctx.audit("integrity-update", Outcome::Ok, Some(path), None);
    output::success(&format!("Baseline updated for {path}"));
    Ok(())
}

/// Execute `trustvault integrity check`.
pub fn execute_check(cli: &Cli, yes: bool) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut host = CliRemediationHost {
        assume_yes: yes,
        cache_dir: ctx.settings.cache_path(&ctx.project_dir),
        project_dir: ctx.project_dir.clone(),
    };

    let outcome = ctx.integrity()?.startup_check(&mut host).inspect_err(|e| {
        // Declining remediation leaves the mismatch standing.
        let outcome = match e {
            TrustVaultError::IntegrityMismatch(_) => Outcome::Rejected,
            _ => Outcome::Failed,
        };
        ctx.audit("integrity-check", outcome, None, Some(&e.to_string()));
    })?;

    match outcome {
        StartupOutcome::Clean => {
            ctx.audit("integrity-check", Outcome::Ok, None, Some("clean"));
            output::success("Integrity check passed.");
        }
        StartupOutcome::Remediated(report) => {
            ctx.audit(
                "integrity-remediate",
                Outcome::Ok,
                corrupted_target(&report).as_deref(),
                Some(&summary(&report)),
            );
            output::warning("Local state was reset after an integrity failure.");
            output::tip("Restore your data with `trustvault backup restore <FILE>`.");
        }
    }
    Ok(())
}

fn outcome_of(report: &IntegrityReport) -> Outcome {
    if report.valid {
        Outcome::Ok
    } else {
        Outcome::Rejected
    }
}

/// The corrupted paths, as the audit target of a failed check.
fn corrupted_target(report: &IntegrityReport) -> Option<String> {
    (!report.corrupted_files.is_empty()).then(|| report.corrupted_files.join(","))
}

fn summary(report: &IntegrityReport) -> String {
    if report.valid {
        "valid".to_string()
    } else {
        format!("corrupted: {}", report.corrupted_files.join(", "))
    }
}

/// Remediation hooks for a command-line process.
///
/// A CLI run has no background workers; the only cache it owns is the
/// configured `cache_dir`.
struct CliRemediationHost {
    assume_yes: bool,
    cache_dir: Option<PathBuf>,
    project_dir: PathBuf,
}

impl RemediationHost for CliRemediationHost {
    fn confirm(&mut self, report: &IntegrityReport) -> bool {
        output::error(&format!(
            "{} tracked file(s) failed the integrity check.",
            report.corrupted_files.len()
        ));
        output::print_corrupted_files(&report.corrupted_files);
        if self.assume_yes {
            return true;
        }
        confirm(&format!(
            "{} all local state except the manifest?",
            style("Erase").red().bold()
        ))
        .unwrap_or(false)
    }

    fn unregister_workers(&mut self) -> Result<usize> {
        debug!("no background workers to unregister");
        Ok(0)
    }

    fn clear_caches(&mut self) -> Result<usize> {
        let Some(dir) = &self.cache_dir else {
            return Ok(0);
        };
        if !dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
            removed += 1;
        }
        Ok(removed)
    }

    fn reload(&mut self) -> Result<()> {
        // Re-read configuration so the rest of this run sees a fresh start.
        Settings::load(&self.project_dir)?;
        output::info("Reloaded configuration.");
        Ok(())
    }
}
