//! `trustvault backup` — export and restore the vault contents.
//!
//! Usage:
//!   trustvault backup create -o progress.tvbak
//!   trustvault backup create -o progress.tvbak --encrypt
//!   trustvault backup restore progress.tvbak

use std::fs;
use std::path::Path;

use crate::audit::Outcome;
use crate::backup::BackupEnvelope;
use crate::cli::output;
use crate::cli::{
    confirm, prompt_backup_password, prompt_new_backup_password, prompt_new_password,
    prompt_password, Cli, Context,
};
use crate::errors::{Result, TrustVaultError};
use crate::vault::VaultData;

/// Execute `trustvault backup create`.
pub fn execute_create(cli: &Cli, output_path: &str, encrypt: bool) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut vault = ctx.vault()?;

    let passphrase = prompt_password()?;
    let data = ctx.unlock(&mut vault, &passphrase)?;
    vault.lock();

    let archiver = ctx.archiver()?;
    let envelope = if encrypt {
        let backup_passphrase = prompt_new_backup_password()?;
        archiver.build_encrypted(&data, &backup_passphrase)?
    } else {
        archiver.build(&data)?
    };

    write_private(Path::new(output_path), envelope.to_json()?.as_bytes())?;

    ctx.audit(
        "backup-create",
        Outcome::Ok,
        Some(output_path),
        Some(if encrypt { "encrypted" } else { "plain" }),
    );
    output::success(&format!("Backup written to {output_path}"));
    if !encrypt {
        output::tip("Plain backups are checksummed, not encrypted. Use --encrypt to protect them.");
    }
    Ok(())
}

/// Execute `trustvault backup restore`.
///
/// The backup is fully verified before the vault is touched.
pub fn execute_restore(cli: &Cli, file: &str, force: bool) -> Result<()> {
    let ctx = Context::load(cli)?;
    let bytes = fs::read(file)
        .map_err(|e| TrustVaultError::CommandFailed(format!("cannot read {file}: {e}")))?;

    let envelope = BackupEnvelope::parse(&bytes).inspect_err(|e| {
        ctx.audit("backup-restore", Outcome::Rejected, Some(file), Some(&e.to_string()));
    })?;
    let backup_passphrase = if envelope.is_encrypted() {
        Some(prompt_backup_password()?)
    } else {
        None
    };

    let restored: VaultData = ctx
        .archiver()?
        .restore_as(&bytes, backup_passphrase.as_ref().map(|p| p.as_str()))
        .inspect_err(|e| {
            let rejected =
                e.is_integrity_failure() || matches!(e, TrustVaultError::InvalidFormat(_));
            let outcome = if rejected {
                Outcome::Rejected
            } else {
                Outcome::Failed
            };
            ctx.audit("backup-restore", outcome, Some(file), Some(&e.to_string()));
        })?;

    let mut vault = ctx.vault()?;
    if vault.exists()? {
        let passphrase = prompt_password()?;
        let current = ctx.unlock(&mut vault, &passphrase)?;
        if !current.is_empty()
            && !force
            && !confirm("Replace the current vault contents with the backup?")?
        {
            vault.lock();
            return Err(TrustVaultError::UserCancelled);
        }
        vault.save(restored)?;
    } else {
        output::info("No vault yet — creating one for the restored contents.");
        let passphrase = prompt_new_password()?;
        vault.create(&passphrase, restored)?;
    }
    vault.lock();

    ctx.audit("backup-restore", Outcome::Ok, Some(file), None);
    output::success(&format!(
        "Restored backup from {} (format {}, app {})",
        file, envelope.meta.version, envelope.meta.app_version
    ));
    Ok(())
}

/// Write `contents` to `path` readable by the owner only.
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
