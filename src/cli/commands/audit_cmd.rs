//! `trustvault audit` — review recorded operations.
//!
//! Usage:
//!   trustvault audit                        # last 50 entries
//!   trustvault audit --since 7d             # relative: w, d, h, m
//!   trustvault audit --since 2026-10-01     # or a date / RFC 3339 time
//!   trustvault audit --family backup        # vault, backup, integrity, cert
//!   trustvault audit --problems             # rejected or failed only

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{AuditEntry, AuditFilter, AuditLog, Family, Outcome};
use crate::cli::output;
use crate::cli::{Cli, Context};
use crate::errors::{Result, TrustVaultError};

/// Execute the `audit` command.
pub fn execute(
    cli: &Cli,
    last: usize,
    since: Option<&str>,
    family: Option<Family>,
    problems: bool,
) -> Result<()> {
    let filter = AuditFilter {
        since: since.map(parse_since).transpose()?,
        family,
        problems_only: problems,
    };

    let ctx = Context::load(cli)?;
    let entries = if AuditLog::db_path(&ctx.data_dir).exists() {
        AuditLog::open(&ctx.data_dir)
            .ok_or_else(|| TrustVaultError::AuditError("cannot open the audit database".into()))?
            .recent(last, &filter)?
    } else {
        Vec::new()
    };

    if entries.is_empty() {
        output::info("No matching audit entries.");
        return Ok(());
    }

    print_entries(&entries);
    Ok(())
}

/// Start of the window for `--since`.
fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc));
    }
    if let Some(midnight) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    let invalid = || {
        TrustVaultError::CommandFailed(format!(
            "invalid --since '{input}': use 2w, 7d, 24h, 30m, a date (2026-10-01) or an RFC 3339 time"
        ))
    };
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (amount, unit) = input.split_at(split);
    let amount: i64 = amount.parse().map_err(|_| invalid())?;
    let span = match unit {
        "w" => TimeDelta::try_weeks(amount),
        "d" => TimeDelta::try_days(amount),
        "h" => TimeDelta::try_hours(amount),
        "m" => TimeDelta::try_minutes(amount),
        _ => None,
    }
    .ok_or_else(invalid)?;

    Utc::now().checked_sub_signed(span).ok_or_else(invalid)
}

fn print_entries(entries: &[AuditEntry]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time (UTC)", "Operation", "Outcome", "Target", "Details"]);

    for entry in entries {
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            styled_operation(entry),
            styled_outcome(entry.outcome),
            entry.target.clone().unwrap_or_else(|| "-".into()),
            entry.details.clone().unwrap_or_else(|| "-".into()),
        ]);
    }

    let rejected = entries.iter().filter(|e| e.outcome == Outcome::Rejected).count();
    let failed = entries.iter().filter(|e| e.outcome == Outcome::Failed).count();
    println!(
        "{} ({rejected} rejected, {failed} failed)",
        style(format!("{} audit entries", entries.len())).bold()
    );
    println!("{table}");
}

fn styled_operation(entry: &AuditEntry) -> String {
    let op = style(&entry.operation);
    match entry.family() {
        Some(Family::Vault) => op.blue(),
        Some(Family::Backup) => op.cyan(),
        Some(Family::Integrity) => op.magenta(),
        Some(Family::Cert) => op.green(),
        None => op,
    }
    .to_string()
}

fn styled_outcome(outcome: Outcome) -> String {
    match outcome {
        Outcome::Ok => style(outcome.as_str()).green(),
        Outcome::Rejected => style(outcome.as_str()).yellow().bold(),
        Outcome::Failed => style(outcome.as_str()).red().bold(),
    }
    .to_string()
}
