use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backup::DEFAULT_MAX_PAYLOAD_BYTES;
use crate::certificate::DEFAULT_ISSUER;
use crate::crypto::kdf::{Argon2Params, KdfParams, DEFAULT_PBKDF2_ITERATIONS};
use crate::errors::{Result, TrustVaultError};
use crate::integrity::DEFAULT_TRACKED_FILES;

/// Project-level configuration, loaded from `.trustvault.toml`.
///
/// Every field has a sensible default so TrustVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to project root) holding the persisted state.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Key derivation for new vaults and encrypted backups:
    /// `pbkdf2-sha256` or `argon2id`.
    #[serde(default = "default_kdf")]
    pub kdf: String,

    /// PBKDF2 iteration count (default: 100 000).
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Version string stamped into backup metadata.
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Issuer name written into certificates.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Resource paths covered by the integrity manifest.
    #[serde(default = "default_tracked_files")]
    pub tracked_files: Vec<String>,

    /// Directory (relative to project root) the tracked paths resolve in.
    #[serde(default = "default_resource_root")]
    pub resource_root: String,

    /// Fetch tracked paths over HTTP from this base URL instead of
    /// `resource_root`. Needs the `http-fetch` feature.
    #[serde(default)]
    pub resource_base_url: Option<String>,

    /// Cache directory wiped during integrity remediation.
    #[serde(default)]
    pub cache_dir: Option<String>,

    /// Upper bound on the decompressed size of a backup payload.
    #[serde(default = "default_max_backup_bytes")]
    pub max_backup_bytes: u64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_data_dir() -> String {
    ".trustvault".to_string()
}

fn default_kdf() -> String {
    "pbkdf2-sha256".to_string()
}

fn default_pbkdf2_iterations() -> u32 {
    DEFAULT_PBKDF2_ITERATIONS
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_issuer() -> String {
    DEFAULT_ISSUER.to_string()
}

fn default_tracked_files() -> Vec<String> {
    DEFAULT_TRACKED_FILES.iter().map(|s| (*s).to_string()).collect()
}

fn default_resource_root() -> String {
    "dist".to_string()
}

fn default_max_backup_bytes() -> u64 {
    DEFAULT_MAX_PAYLOAD_BYTES
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            kdf: default_kdf(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            app_version: default_app_version(),
            issuer: default_issuer(),
            tracked_files: default_tracked_files(),
            resource_root: default_resource_root(),
            resource_base_url: None,
            cache_dir: None,
            max_backup_bytes: default_max_backup_bytes(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".trustvault.toml";

    /// Load settings from `<project_dir>/.trustvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            TrustVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        tracing::debug!(path = %config_path.display(), "settings loaded");
        Ok(settings)
    }

    /// Directory holding the key-value state.
    ///
    /// Example: `project_dir/.trustvault`
    pub fn data_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.data_dir)
    }

    /// Directory the integrity fetcher reads tracked paths from.
    pub fn resource_root_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.resource_root)
    }

    /// Cache directory to wipe during remediation, if one is configured.
    pub fn cache_path(&self, project_dir: &Path) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| project_dir.join(dir))
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    /// The configured KDF with its cost parameters, validated.
    pub fn kdf_params(&self) -> Result<KdfParams> {
        let params = match self.kdf.to_ascii_lowercase().as_str() {
            "pbkdf2-sha256" | "pbkdf2" => KdfParams::Pbkdf2Sha256 {
                iterations: self.pbkdf2_iterations,
            },
            "argon2id" | "argon2" => KdfParams::Argon2id(self.argon2_params()),
            other => {
                return Err(TrustVaultError::ConfigError(format!(
                    "unknown kdf '{other}' — expected pbkdf2-sha256 or argon2id"
                )))
            }
        };
        params
            .validate()
            .map_err(|e| TrustVaultError::ConfigError(e.to_string()))?;
        Ok(params)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.data_dir, ".trustvault");
        assert_eq!(s.kdf, "pbkdf2-sha256");
        assert_eq!(s.pbkdf2_iterations, 100_000);
        assert_eq!(s.issuer, "Security Lab");
        assert_eq!(s.tracked_files.len(), DEFAULT_TRACKED_FILES.len());
        assert!(s.resource_base_url.is_none());
        assert!(s.cache_dir.is_none());
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.data_dir, ".trustvault");
        assert_eq!(
            settings.kdf_params().unwrap(),
            KdfParams::Pbkdf2Sha256 {
                iterations: 100_000
            }
        );
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
data_dir = "state"
kdf = "argon2id"
argon2_memory_kib = 131072
argon2_iterations = 5
argon2_parallelism = 8
issuer = "Night School"
tracked_files = ["/app.js", "/app.css"]
cache_dir = "cache"
max_backup_bytes = 1024
"#;
        fs::write(tmp.path().join(".trustvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.data_dir, "state");
        assert_eq!(settings.issuer, "Night School");
        assert_eq!(settings.tracked_files, vec!["/app.js", "/app.css"]);
        assert_eq!(settings.max_backup_bytes, 1024);
        assert_eq!(settings.cache_path(tmp.path()), Some(tmp.path().join("cache")));
        assert_eq!(
            settings.kdf_params().unwrap(),
            KdfParams::Argon2id(Argon2Params {
                memory_kib: 131_072,
                iterations: 5,
                parallelism: 8,
            })
        );
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".trustvault.toml"), "issuer = \"X\"\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.issuer, "X");
        assert_eq!(settings.data_dir, ".trustvault");
        assert_eq!(settings.resource_root, "dist");
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".trustvault.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(matches!(result, Err(TrustVaultError::ConfigError(_))));
    }

    #[test]
    fn kdf_params_rejects_unknown_algorithm() {
        let s = Settings {
            kdf: "scrypt".into(),
            ..Settings::default()
        };
        assert!(matches!(s.kdf_params(), Err(TrustVaultError::ConfigError(_))));
    }

    #[test]
    fn kdf_params_rejects_cheap_iterations() {
        let s = Settings {
            pbkdf2_iterations: 10,
            ..Settings::default()
        };
        assert!(s.kdf_params().is_err());
    }

    #[test]
    fn data_path_respects_custom_dir() {
        let s = Settings {
            data_dir: "state".to_string(),
            ..Settings::default()
        };
        let project = Path::new("/home/user/app");
        assert_eq!(s.data_path(project), PathBuf::from("/home/user/app/state"));
        assert_eq!(
            s.resource_root_path(project),
            PathBuf::from("/home/user/app/dist")
        );
    }
}
