//! What an audit record says about an operation.
//!
//! Operation names are `<family>-<verb>` (`vault-unlock`, `backup-restore`,
//! `integrity-check`, `cert-verify`), so the family can always be recovered
//! from the name alone.

use std::fmt;
use std::str::FromStr;

/// How an audited operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Completed as requested.
    Ok,
    /// Refused because the input did not check out: wrong passphrase,
    /// tampered backup, corrupted files, a certificate that fails to verify.
    Rejected,
    /// Could not complete for another reason (I/O, a remediation step).
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }

    /// Anything worth a second look.
    pub fn is_problem(self) -> bool {
        self != Self::Ok
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Self::Ok),
            "rejected" => Ok(Self::Rejected),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown outcome '{other}'")),
        }
    }
}

/// The subsystem an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Vault,
    Backup,
    Integrity,
    Cert,
}

impl Family {
    pub const ALL: [Family; 4] = [Self::Vault, Self::Backup, Self::Integrity, Self::Cert];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vault => "vault",
            Self::Backup => "backup",
            Self::Integrity => "integrity",
            Self::Cert => "cert",
        }
    }

    /// Family of an operation name such as `backup-restore`.
    pub fn of(operation: &str) -> Option<Self> {
        let (prefix, _) = operation.split_once('-')?;
        Self::ALL.into_iter().find(|f| f.as_str() == prefix)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| format!("unknown family '{s}' (expected vault, backup, integrity or cert)"))
    }
}
