//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::integrity::IntegrityManifest;
use crate::vault::VaultData;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print the vault record as a Section / Key / Value table.
pub fn print_vault_table(data: &VaultData) {
    if data.is_empty() {
        info("The vault is empty.");
        tip("Run `trustvault vault import <FILE>` to load contents.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Section", "Key", "Value"]);

    for (key, value) in &data.progress {
        table.add_row(vec!["progress".to_string(), key.clone(), value.to_string()]);
    }
    for (key, note) in &data.notes {
        table.add_row(vec!["notes".to_string(), key.clone(), note.clone()]);
    }
    for (key, value) in &data.preferences {
        table.add_row(vec!["preferences".to_string(), key.clone(), value.to_string()]);
    }

    println!("{table}");
}

/// Print the files of a manifest with shortened hashes.
pub fn print_manifest_table(manifest: &IntegrityManifest) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "SHA-256"]);

    for (path, hash) in &manifest.files {
        let short = hash.get(..16).unwrap_or(hash);
        table.add_row(vec![path.clone(), format!("{short}…")]);
    }

    println!("{table}");
}

/// Print the files that failed verification.
pub fn print_corrupted_files(paths: &[String]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Corrupted file"]);
    for path in paths {
        table.add_row(vec![style(path).red().to_string()]);
    }
    eprintln!("{table}");
}
