//! `trustvault version` — display version and on-disk format versions.

use console::style;

use crate::backup::{BACKUP_HEADER, FORMAT_VERSION};
use crate::errors::Result;
use crate::integrity::MANIFEST_VERSION;

/// Execute the `version` command.
pub fn execute() -> Result<()> {
    println!("trustvault {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  {} {BACKUP_HEADER} (v{FORMAT_VERSION})",
        style("backup format:").dim()
    );
    println!(
        "  {} {MANIFEST_VERSION}",
        style("manifest format:").dim()
    );
    println!("  {} {}", style("features:").dim(), features().join(", "));
    Ok(())
}

fn features() -> Vec<&'static str> {
    let mut enabled = Vec::new();
    if cfg!(feature = "audit-log") {
        enabled.push("audit-log");
    }
    if cfg!(feature = "http-fetch") {
        enabled.push("http-fetch");
    }
    if enabled.is_empty() {
        enabled.push("none");
    }
    enabled
}
