//! `trustvault completions` — generate shell completion scripts.
//!
//! Usage:
//!   trustvault completions bash > ~/.bash_completion.d/trustvault
//!   trustvault completions zsh

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::{Result, TrustVaultError};

/// Execute the `completions` command.
pub fn execute(shell: &str) -> Result<()> {
    write_completions(parse_shell(shell)?, &mut io::stdout())
}

/// Render the completion script for `shell` into `out`.
pub fn write_completions(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, out);
    Ok(())
}

fn parse_shell(name: &str) -> Result<Shell> {
    match name.to_lowercase().as_str() {
        "powershell" | "ps" => Ok(Shell::PowerShell),
        other => other.parse::<Shell>().map_err(|_| {
            TrustVaultError::CommandFailed(format!(
                "unknown shell '{other}' — supported: bash, zsh, fish, powershell, elvish"
            ))
        }),
    }
}
