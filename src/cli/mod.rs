//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use zeroize::Zeroizing;

use crate::audit::{Family, Outcome};
use crate::backup::BackupArchiver;
use crate::certificate::CertificateAuthority;
use crate::config::Settings;
use crate::crypto::{CryptoProvider, SystemCrypto};
use crate::errors::{Result, TrustVaultError};
use crate::integrity::{DirFetcher, IntegrityChecker, ResourceFetcher};
use crate::storage::{FileStore, KeyValueStore};
use crate::vault::{VaultData, VaultStore, MIN_PASSPHRASE_LEN};

/// Environment variable consulted before prompting for the vault passphrase.
pub const PASSWORD_ENV: &str = "TRUSTVAULT_PASSWORD";

/// Environment variable consulted before prompting for a backup passphrase.
pub const BACKUP_PASSWORD_ENV: &str = "TRUSTVAULT_BACKUP_PASSWORD";

/// TrustVault CLI: local-first cryptographic trust layer.
#[derive(Parser)]
#[command(
    name = "trustvault",
    about = "Encrypted vault, checked backups, integrity manifests and self-verifiable certificates",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// State directory (default: `data_dir` from .trustvault.toml, else .trustvault)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// Print debug diagnostics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create, inspect and manage the encrypted vault
    Vault {
        #[command(subcommand)]
        action: VaultAction,
    },

    /// Export or restore checksummed backups of the vault contents
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Baseline and verify application file hashes
    Integrity {
        #[command(subcommand)]
        action: IntegrityAction,
    },

    /// Issue and verify self-contained signed certificates
    Cert {
        #[command(subcommand)]
        action: CertAction,
    },

    /// Review recorded operations and their outcomes
    Audit {
        /// Number of entries to show
        #[arg(long, default_value = "50")]
        last: usize,
        /// Only entries since a duration ago (2w, 7d, 24h, 30m) or a date
        #[arg(long)]
        since: Option<String>,
        /// Only one subsystem: vault, backup, integrity or cert
        #[arg(long)]
        family: Option<Family>,
        /// Only rejected or failed operations
        #[arg(long)]
        problems: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },

    /// Show version information
    Version,
}

/// Vault subcommands.
#[derive(clap::Subcommand)]
pub enum VaultAction {
    /// Create a new vault
    Init {
        /// JSON file with the initial vault contents
        #[arg(long)]
        from: Option<String>,
    },

    /// Unlock the vault and print its contents
    Show {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Replace the vault contents with a JSON file
    Import {
        /// Path to the JSON file
        file: String,
    },

    /// Change the vault passphrase
    Passwd,

    /// Show whether a vault exists and how it is protected
    Status,

    /// Permanently erase the vault
    Destroy {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Backup subcommands.
#[derive(clap::Subcommand)]
pub enum BackupAction {
    /// Write the vault contents to a backup file
    Create {
        /// Output file path
        #[arg(short, long)]
        output: String,
        /// Also encrypt the backup under a separate passphrase
        #[arg(long)]
        encrypt: bool,
    },

    /// Load a backup file into the vault
    Restore {
        /// Backup file path
        file: String,
        /// Overwrite existing vault contents without asking
        #[arg(short, long)]
        force: bool,
    },
}

/// Integrity subcommands.
#[derive(clap::Subcommand)]
pub enum IntegrityAction {
    /// Hash every tracked file and store a fresh manifest
    Generate,

    /// Compare tracked files against the stored manifest
    Verify {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-baseline a single file after a legitimate change
    Update {
        /// Resource path as listed in the manifest (e.g. /index.html)
        path: String,
    },

    /// Verify and, on failure, reset local state
    Check {
        /// Remediate without asking
        #[arg(short, long)]
        yes: bool,
    },
}

/// Certificate subcommands.
#[derive(clap::Subcommand)]
pub enum CertAction {
    /// Sign a new certificate
    Issue {
        /// Claim as key=value (value parsed as JSON when possible); repeatable
        #[arg(short, long = "claim", value_parser = parse_claim)]
        claims: Vec<(String, serde_json::Value)>,
        /// JSON object file with claims; --claim values are applied on top
        #[arg(long)]
        claims_file: Option<String>,
        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Check a certificate bundle's signature
    Verify {
        /// Path to the bundle JSON
        file: String,
        /// Print the signed claims after a successful check
        #[arg(long)]
        show_claims: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Everything a command needs: resolved settings and the service handles.
pub struct Context {
    pub project_dir: PathBuf,
    pub settings: Settings,
    pub data_dir: PathBuf,
    pub crypto: Arc<dyn CryptoProvider>,
}

impl Context {
    /// Resolve settings from the working directory and CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let project_dir = std::env::current_dir()?;
        let settings = Settings::load(&project_dir)?;
        let data_dir = match &cli.data_dir {
            Some(dir) => project_dir.join(dir),
            None => settings.data_path(&project_dir),
        };
        Ok(Self {
            project_dir,
            settings,
            data_dir,
            crypto: SystemCrypto::shared(),
        })
    }

    /// Directory holding the key-value state.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    pub fn store(&self) -> Result<Arc<dyn KeyValueStore>> {
        Ok(Arc::new(FileStore::open(&self.store_dir())?))
    }

    pub fn vault(&self) -> Result<VaultStore> {
        Ok(VaultStore::new(self.store()?, self.crypto.clone()).with_kdf(self.settings.kdf_params()?))
    }

    pub fn archiver(&self) -> Result<BackupArchiver> {
        Ok(BackupArchiver::new(self.crypto.clone())
            .with_app_version(self.settings.app_version.clone())
            .with_max_payload_bytes(self.settings.max_backup_bytes)
            .with_kdf(self.settings.kdf_params()?))
    }

    pub fn integrity(&self) -> Result<IntegrityChecker> {
        Ok(IntegrityChecker::new(
            self.store()?,
            self.fetcher()?,
            self.crypto.clone(),
        ))
    }

    pub fn authority(&self) -> CertificateAuthority {
        CertificateAuthority::new(self.crypto.clone()).with_issuer(self.settings.issuer.clone())
    }

    /// Record an operation in the audit log.
    pub fn audit(&self, op: &str, outcome: Outcome, target: Option<&str>, details: Option<&str>) {
        crate::audit::log_audit(&self.data_dir, op, outcome, target, details);
    }

    /// Unlock `vault`; a refused passphrase is recorded as a rejected unlock.
    pub fn unlock(&self, vault: &mut VaultStore, passphrase: &str) -> Result<VaultData> {
        vault.unlock(passphrase).inspect_err(|e| {
            if matches!(e, TrustVaultError::InvalidPassphraseOrCorruptedData) {
                self.audit("vault-unlock", Outcome::Rejected, None, Some(&e.to_string()));
            }
        })
    }

    fn fetcher(&self) -> Result<Arc<dyn ResourceFetcher>> {
        match &self.settings.resource_base_url {
            #[cfg(feature = "http-fetch")]
            Some(url) => Ok(Arc::new(crate::integrity::HttpFetcher::new(url.clone()))),
            #[cfg(not(feature = "http-fetch"))]
            Some(_) => Err(TrustVaultError::ConfigError(
                "resource_base_url needs the `http-fetch` feature".into(),
            )),
            None => Ok(Arc::new(DirFetcher::new(
                self.settings.resource_root_path(&self.project_dir),
            ))),
        }
    }
}

/// Get the vault passphrase, trying in order:
/// 1. `TRUSTVAULT_PASSWORD` env var (CI/CD)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    prompt_existing(PASSWORD_ENV, "Enter vault passphrase")
}

/// Prompt for a new vault passphrase with confirmation.
///
/// Also respects `TRUSTVAULT_PASSWORD` for scripted/CI usage.
/// Enforces a minimum passphrase length.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    prompt_new(PASSWORD_ENV, "Choose vault passphrase")
}

/// Passphrase for an existing encrypted backup.
pub fn prompt_backup_password() -> Result<Zeroizing<String>> {
    prompt_existing(BACKUP_PASSWORD_ENV, "Enter backup passphrase")
}

/// New passphrase for an encrypted backup, with confirmation.
pub fn prompt_new_backup_password() -> Result<Zeroizing<String>> {
    prompt_new(BACKUP_PASSWORD_ENV, "Choose backup passphrase")
}

/// Ask a yes/no question. Non-interactive sessions get `false`.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !console::Term::stderr().is_term() {
        return Ok(false);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| TrustVaultError::CommandFailed(format!("failed to read confirmation: {e}")))
}

fn env_password(var: &str) -> Option<Zeroizing<String>> {
    std::env::var(var)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

fn prompt_existing(var: &str, prompt: &str) -> Result<Zeroizing<String>> {
    if let Some(pw) = env_password(var) {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| TrustVaultError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

fn prompt_new(var: &str, prompt: &str) -> Result<Zeroizing<String>> {
    if let Some(pw) = env_password(var) {
        if pw.chars().count() < MIN_PASSPHRASE_LEN {
            return Err(TrustVaultError::WeakPassphrase(MIN_PASSPHRASE_LEN));
        }
        return Ok(pw);
    }

    loop {
        let passphrase = dialoguer::Password::new()
            .with_prompt(prompt)
            .with_confirmation("Confirm passphrase", "Passphrases do not match, try again")
            .interact()
            .map_err(|e| TrustVaultError::CommandFailed(format!("passphrase prompt: {e}")))?;

        if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
            output::warning(&format!(
                "Passphrase must be at least {MIN_PASSPHRASE_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(passphrase));
    }
}

/// Parse a `key=value` claim. The value is taken as JSON when it parses
/// (`score=100` → number) and as a plain string otherwise.
pub fn parse_claim(raw: &str) -> std::result::Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("claim '{raw}' must look like key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("claim '{raw}' has an empty key"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Read a UTF-8 file, naming it in the error.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        TrustVaultError::CommandFailed(format!("cannot read {}: {e}", path.display()))
    })
}
