//! `trustvault vault` — lifecycle of the encrypted vault.
//!
//! Subcommands:
//! - `trustvault vault init [--from FILE]` — create a vault
//! - `trustvault vault show [--json]`      — unlock and print contents
//! - `trustvault vault import FILE`        — replace contents from JSON
//! - `trustvault vault passwd`             — change the passphrase
//! - `trustvault vault status`             — existence and KDF
//! - `trustvault vault destroy [--force]`  — erase the vault

use std::path::Path;

use crate::audit::Outcome;
use crate::cli::output;
use crate::cli::{confirm, prompt_new_password, prompt_password, read_text, Cli, Context};
use crate::errors::{Result, TrustVaultError};
use crate::storage::VAULT_BLOB_KEY;
use crate::vault::{VaultBlob, VaultData, VaultState};

/// Execute `trustvault vault init`.
pub fn execute_init(cli: &Cli, from: Option<&str>) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut vault = ctx.vault()?;

    if vault.exists()? {
        output::tip("Use `trustvault vault import` to replace its contents.");
        return Err(TrustVaultError::VaultAlreadyExists);
    }

    let initial = match from {
        Some(path) => load_vault_data(Path::new(path))?,
        None => VaultData::default(),
    };

    let passphrase = prompt_new_password()?;
    vault.create(&passphrase, initial)?;

    ctx.audit("vault-init", Outcome::Ok, None, Some("vault created"));
    output::success(&format!("Vault created in {}", ctx.store_dir().display()));
    output::tip("Run `trustvault vault show` to see its contents.");
    Ok(())
}

/// Execute `trustvault vault show`.
pub fn execute_show(cli: &Cli, json: bool) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut vault = ctx.vault()?;

    let passphrase = prompt_password()?;
    let data = ctx.unlock(&mut vault, &passphrase)?;
    vault.lock();
    ctx.audit("vault-unlock", Outcome::Ok, None, None);

    if json {
        let text = serde_json::to_string_pretty(&data)
            .map_err(|e| TrustVaultError::SerializationError(format!("vault data: {e}")))?;
        println!("{text}");
    } else {
        output::print_vault_table(&data);
    }
    Ok(())
}

/// Execute `trustvault vault import`.
pub fn execute_import(cli: &Cli, file: &str) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut vault = ctx.vault()?;
    let data = load_vault_data(Path::new(file))?;

    let passphrase = prompt_password()?;
    ctx.unlock(&mut vault, &passphrase)?;
    vault.save(data)?;
    vault.lock();

    ctx.audit("vault-import", Outcome::Ok, Some(file), None);
    output::success(&format!("Vault contents replaced from {file}"));
    Ok(())
}

/// Execute `trustvault vault passwd`.
pub fn execute_passwd(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut vault = ctx.vault()?;

    output::info("Enter your current vault passphrase.");
    let current = prompt_password()?;
    ctx.unlock(&mut vault, &current)?;

    output::info("Choose your new vault passphrase.");
    let new_passphrase = prompt_new_password()?;
    vault.change_passphrase(&new_passphrase)?;
    vault.lock();

    ctx.audit("vault-passwd", Outcome::Ok, None, Some("passphrase changed"));
    output::success("Vault passphrase changed.");
    Ok(())
}

/// Execute `trustvault vault status`.
pub fn execute_status(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let vault = ctx.vault()?;

    match vault.state()? {
        VaultState::NonExistent => {
            output::info("No vault yet.");
            output::tip("Run `trustvault vault init` to create one.");
        }
        VaultState::Locked | VaultState::Unlocked => {
            output::success(&format!("Vault present in {}", ctx.store_dir().display()));
            if let Some(encoded) = ctx.store()?.get(VAULT_BLOB_KEY)? {
                match VaultBlob::decode(&encoded) {
                    Ok(blob) => output::info(&format!("Key derivation: {}", blob.kdf)),
                    Err(e) => output::warning(&format!("Vault blob is unreadable: {e}")),
                }
            }
        }
    }
    Ok(())
}

/// Execute `trustvault vault destroy`.
pub fn execute_destroy(cli: &Cli, force: bool) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut vault = ctx.vault()?;

    if !vault.exists()? {
        return Err(TrustVaultError::VaultNotFound);
    }

    if !force && !confirm("Permanently erase the vault? This cannot be undone")? {
        return Err(TrustVaultError::UserCancelled);
    }

    vault.destroy()?;
    ctx.audit("vault-destroy", Outcome::Ok, None, None);
    output::success("Vault destroyed.");
    Ok(())
}

/// Parse a JSON file into vault contents.
fn load_vault_data(path: &Path) -> Result<VaultData> {
    let text = read_text(path)?;
    serde_json::from_str(&text)
        .map_err(|e| TrustVaultError::InvalidFormat(format!("{}: {e}", path.display())))
}
