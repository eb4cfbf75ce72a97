//! SQLite store behind the audit trail.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, Row};

use super::event::{Family, Outcome};
use crate::errors::{Result, TrustVaultError};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS events (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    at        TEXT NOT NULL,
    operation TEXT NOT NULL,
    outcome   TEXT NOT NULL,
    target    TEXT,
    details   TEXT
);
CREATE INDEX IF NOT EXISTS events_at ON events (at);";

/// One recorded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub outcome: Outcome,
    /// What the operation acted on: a backup file, a manifest path, a DID.
    pub target: Option<String>,
    pub details: Option<String>,
}

impl AuditEntry {
    pub fn family(&self) -> Option<Family> {
        Family::of(&self.operation)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let at: String = row.get(1)?;
        let outcome: String = row.get(3)?;
        Ok(Self {
            id: row.get(0)?,
            // Rows are only ever written by `record`, so `at` is RFC 3339.
            timestamp: DateTime::parse_from_rfc3339(&at)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_default(),
            operation: row.get(2)?,
            outcome: outcome.parse().unwrap_or(Outcome::Failed),
            target: row.get(4)?,
            details: row.get(5)?,
        })
    }
}

/// Which entries `AuditLog::recent` returns.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub since: Option<DateTime<Utc>>,
    pub family: Option<Family>,
    /// Only rejected or failed operations.
    pub problems_only: bool,
}

/// Append-only log at `<data_dir>/audit.db`.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    pub const FILE_NAME: &'static str = "audit.db";

    /// `None` when the database cannot be opened; callers carry on
    /// without an audit trail.
    pub fn open(data_dir: &Path) -> Option<Self> {
        let path = Self::db_path(data_dir);
        let conn = Connection::open(&path)
            .inspect_err(|e| tracing::debug!(error = %e, path = %path.display(), "audit log unavailable"))
            .ok()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
        }

        conn.execute_batch(SCHEMA).ok()?;
        Some(Self { conn })
    }

    pub fn db_path(data_dir: &Path) -> PathBuf {
        data_dir.join(Self::FILE_NAME)
    }

    /// Append an entry. A failed write is traced and otherwise ignored.
    pub fn record(
        &self,
        operation: &str,
        outcome: Outcome,
        target: Option<&str>,
        details: Option<&str>,
    ) {
        let at = stamp(Utc::now());
        let written = self.conn.execute(
            "INSERT INTO events (at, operation, outcome, target, details) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![at, operation, outcome.as_str(), target, details],
        );
        if let Err(e) = written {
            tracing::debug!(error = %e, operation, "audit write failed");
        }
    }

    /// Up to `limit` entries matching `filter`, newest first.
    pub fn recent(&self, limit: usize, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(since) = filter.since {
            args.push(stamp(since));
            clauses.push(format!("at >= ?{}", args.len()));
        }
        if let Some(family) = filter.family {
            args.push(format!("{}-%", family.as_str()));
            clauses.push(format!("operation LIKE ?{}", args.len()));
        }
        if filter.problems_only {
            clauses.push(format!("outcome <> '{}'", Outcome::Ok.as_str()));
        }

        let mut sql = String::from("SELECT id, at, operation, outcome, target, details FROM events");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY id DESC LIMIT {}", limit.min(i64::MAX as usize)));

        let audit_err = |e: rusqlite::Error| TrustVaultError::AuditError(e.to_string());
        let mut stmt = self.conn.prepare(&sql).map_err(audit_err)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), AuditEntry::from_row)
            .map_err(audit_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(audit_err)
    }
}

/// Fixed-width UTC timestamps so `at` sorts and compares as text.
fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
