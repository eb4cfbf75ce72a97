//! Integration tests for the TrustVault CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.
//! Passphrases come from `TRUSTVAULT_PASSWORD` so nothing prompts, and
//! every project directory carries a `.trustvault.toml` with a cheap KDF.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const PASSPHRASE: &str = "correcthorse1";

/// Helper: get a Command pointing at the trustvault binary.
fn trustvault() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("trustvault").expect("binary should exist")
}

/// A project directory with fast settings and two tracked files.
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tmp.child(".trustvault.toml")
        .write_str(
            r#"
pbkdf2_iterations = 1000
tracked_files = ["/app.js", "/app.css"]
cache_dir = "cache"
"#,
        )
        .unwrap();
    tmp.child("dist/app.js").write_str("console.log(1)").unwrap();
    tmp.child("dist/app.css").write_str("body{}").unwrap();
    tmp
}

/// `trustvault` run inside `dir` with the vault passphrase set.
fn tv(dir: &TempDir) -> Command {
    let mut cmd = trustvault();
    cmd.current_dir(dir.path())
        .env("TRUSTVAULT_PASSWORD", PASSPHRASE)
        .env_remove("TRUSTVAULT_BACKUP_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn init_with_progress(dir: &TempDir) {
    dir.child("initial.json")
        .write_str(r#"{"progress":{"c1":40},"notes":{"n1":"hello"}}"#)
        .unwrap();
    tv(dir)
        .args(["vault", "init", "--from", "initial.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vault created"));
}

// ---------------------------------------------------------------------------
// Basics
// ---------------------------------------------------------------------------

#[test]
fn help_flag_shows_usage() {
    trustvault()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("vault"))
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("integrity"))
        .stdout(predicate::str::contains("cert"))
        .stdout(predicate::str::contains("audit"));
}

#[test]
fn version_flag_shows_version() {
    trustvault()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("trustvault"));
}

#[test]
fn version_command_shows_formats() {
    trustvault()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("TDC_BKP_V2"))
        .stdout(predicate::str::contains("1.0.0"));
}

#[test]
fn no_args_shows_help() {
    trustvault()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn completions_generate_script() {
    trustvault()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trustvault"));

    trustvault().args(["completions", "csh"]).assert().failure();
}

#[test]
fn invalid_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    tmp.child(".trustvault.toml").write_str("not valid {{toml").unwrap();

    tv(&tmp)
        .args(["vault", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file error"));
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

#[test]
fn vault_lifecycle() {
    let tmp = project();

    tv(&tmp)
        .args(["vault", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No vault yet"));

    init_with_progress(&tmp);
    tmp.child(".trustvault/store/vault.blob")
        .assert(predicate::path::exists())
        .assert(predicate::str::contains("hello").not());

    tv(&tmp)
        .args(["vault", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pbkdf2-sha256:i=1000"));

    tv(&tmp)
        .args(["vault", "show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"c1\": 40"))
        .stdout(predicate::str::contains("hello"));

    tv(&tmp)
        .args(["vault", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    tv(&tmp)
        .args(["vault", "destroy", "--force"])
        .assert()
        .success();
    tmp.child(".trustvault/store/vault.blob")
        .assert(predicate::path::missing());
}

#[test]
fn wrong_passphrase_is_rejected() {
    let tmp = project();
    init_with_progress(&tmp);

    tv(&tmp)
        .env("TRUSTVAULT_PASSWORD", "not-the-passphrase")
        .args(["vault", "show", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid passphrase or corrupted data"))
        .stdout(predicate::str::contains("hello").not());
}

#[test]
fn weak_passphrase_is_rejected_on_init() {
    let tmp = project();
    tv(&tmp)
        .env("TRUSTVAULT_PASSWORD", "short")
        .args(["vault", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8 characters"));
}

#[test]
fn show_without_vault_fails() {
    let tmp = project();
    tv(&tmp)
        .args(["vault", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No vault exists"));
}

#[test]
fn data_dir_flag_overrides_settings() {
    let tmp = project();
    tv(&tmp)
        .args(["--data-dir", "elsewhere", "vault", "init"])
        .assert()
        .success();
    tmp.child("elsewhere/store/vault.blob")
        .assert(predicate::path::exists());
}

// ---------------------------------------------------------------------------
// Backup
// ---------------------------------------------------------------------------

#[test]
fn backup_create_destroy_restore() {
    let tmp = project();
    init_with_progress(&tmp);

    tv(&tmp)
        .args(["backup", "create", "-o", "progress.tvbak"])
        .assert()
        .success();
    tmp.child("progress.tvbak")
        .assert(predicate::str::contains("TDC_BKP_V2"))
        .assert(predicate::str::contains("appVersion"));

    tv(&tmp)
        .args(["vault", "destroy", "--force"])
        .assert()
        .success();

    tv(&tmp)
        .args(["backup", "restore", "progress.tvbak"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored backup"));

    tv(&tmp)
        .args(["vault", "show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"));
}

#[test]
fn encrypted_backup_roundtrip() {
    let tmp = project();
    init_with_progress(&tmp);

    tv(&tmp)
        .env("TRUSTVAULT_BACKUP_PASSWORD", "backup-pass-1")
        .args(["backup", "create", "-o", "sealed.tvbak", "--encrypt"])
        .assert()
        .success();
    tmp.child("sealed.tvbak")
        .assert(predicate::str::contains("encryption"))
        .assert(predicate::str::contains("hello").not());

    tv(&tmp)
        .env("TRUSTVAULT_BACKUP_PASSWORD", "backup-pass-2")
        .args(["backup", "restore", "sealed.tvbak", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid passphrase"));

    tv(&tmp)
        .env("TRUSTVAULT_BACKUP_PASSWORD", "backup-pass-1")
        .args(["backup", "restore", "sealed.tvbak", "--force"])
        .assert()
        .success();
}

#[test]
fn tampered_backup_is_refused() {
    let tmp = project();
    init_with_progress(&tmp);
    tv(&tmp)
        .args(["backup", "create", "-o", "progress.tvbak"])
        .assert()
        .success();

    let path = tmp.child("progress.tvbak");
    let text = std::fs::read_to_string(path.path()).unwrap();
    let mut json: serde_json::Value = serde_json::from_str(&text).unwrap();
    json["meta"]["checksum"] = serde_json::json!("00".repeat(32));
    path.write_str(&json.to_string()).unwrap();

    tv(&tmp)
        .args(["backup", "restore", "progress.tvbak", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Integrity mismatch"));
}

#[test]
fn restore_rejects_non_backup_files() {
    let tmp = project();
    tmp.child("notes.txt").write_str("just text").unwrap();
    tv(&tmp)
        .args(["backup", "restore", "notes.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid format"));
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

#[test]
fn integrity_generate_verify_update() {
    let tmp = project();

    tv(&tmp)
        .args(["integrity", "verify"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No integrity manifest"));

    tv(&tmp)
        .args(["integrity", "generate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 files"));

    tv(&tmp)
        .args(["integrity", "verify"])
        .assert()
        .success();

    tmp.child("dist/app.js").write_str("console.log(2)").unwrap();
    tv(&tmp)
        .args(["integrity", "verify", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"corruptedFiles\""))
        .stdout(predicate::str::contains("/app.js"))
        .stdout(predicate::str::contains("/app.css").not());

    tv(&tmp)
        .args(["integrity", "update", "/app.js"])
        .assert()
        .success();
    tv(&tmp)
        .args(["integrity", "verify"])
        .assert()
        .success();
}

#[test]
fn integrity_generate_fails_on_missing_file() {
    let tmp = project();
    std::fs::remove_file(tmp.child("dist/app.css").path()).unwrap();

    tv(&tmp)
        .args(["integrity", "generate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/app.css"));
    tmp.child(".trustvault/store/integrity.manifest")
        .assert(predicate::path::missing());
}

#[test]
fn integrity_check_remediates_with_yes() {
    let tmp = project();
    init_with_progress(&tmp);
    tmp.child("cache/app.js").write_str("stale").unwrap();

    tv(&tmp)
        .args(["integrity", "generate"])
        .assert()
        .success();
    tv(&tmp)
        .args(["integrity", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("passed"));

    tmp.child("dist/app.css").write_str("body{display:none}").unwrap();

    // Without --yes a non-interactive run declines and nothing is erased.
    tv(&tmp)
        .args(["integrity", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Integrity mismatch"));
    tmp.child(".trustvault/store/vault.blob")
        .assert(predicate::path::exists());

    tv(&tmp)
        .args(["integrity", "check", "--yes"])
        .assert()
        .success();
    tmp.child(".trustvault/store/vault.blob")
        .assert(predicate::path::missing());
    tmp.child(".trustvault/store/integrity.manifest")
        .assert(predicate::path::exists());
    tmp.child("cache/app.js").assert(predicate::path::missing());
}

// ---------------------------------------------------------------------------
// Certificates
// ---------------------------------------------------------------------------

#[test]
fn cert_issue_and_verify() {
    let tmp = project();

    tv(&tmp)
        .args([
            "cert", "issue", "-c", "name=alice", "-c", "score=100", "-o", "alice.json",
        ])
        .assert()
        .success();
    tmp.child("alice.json")
        .assert(predicate::str::contains("publicKey"))
        .assert(predicate::str::contains("did:slab:"));

    tv(&tmp)
        .args(["cert", "verify", "alice.json", "--show-claims"])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"))
        .stdout(predicate::str::contains("Security Lab"));
}

#[test]
fn cert_verify_detects_edited_claims() {
    let tmp = project();
    tv(&tmp)
        .args(["cert", "issue", "-c", "score=100", "-o", "cert.json"])
        .assert()
        .success();

    let path = tmp.child("cert.json");
    let text = std::fs::read_to_string(path.path()).unwrap();
    let mut bundle: serde_json::Value = serde_json::from_str(&text).unwrap();
    let payload = bundle["payload"].as_str().unwrap().replace("\"score\":100", "\"score\":101");
    bundle["payload"] = serde_json::json!(payload);
    path.write_str(&bundle.to_string()).unwrap();

    tv(&tmp)
        .args(["cert", "verify", "cert.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOT valid"));
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[cfg(feature = "audit-log")]
#[test]
fn audit_lists_recorded_operations() {
    let tmp = project();
    init_with_progress(&tmp);
    tv(&tmp)
        .args(["integrity", "generate"])
        .assert()
        .success();

    tv(&tmp)
        .args(["audit", "--last", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vault-init"))
        .stdout(predicate::str::contains("integrity-generate"));

    tv(&tmp)
        .args(["audit", "--family", "vault"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vault-init"))
        .stdout(predicate::str::contains("integrity-generate").not());

    tv(&tmp)
        .args(["audit", "--since", "bogus"])
        .assert()
        .failure();
}

#[cfg(feature = "audit-log")]
#[test]
fn audit_problems_show_rejections_with_targets() {
    let tmp = project();
    init_with_progress(&tmp);
    tmp.child("forged.json")
        .write_str(r#"{"payload":"{}","signature":"00","publicKey":{}}"#)
        .unwrap();

    tv(&tmp)
        .env("TRUSTVAULT_PASSWORD", "not-the-passphrase")
        .args(["vault", "show"])
        .assert()
        .failure();
    tv(&tmp)
        .args(["cert", "verify", "forged.json"])
        .assert()
        .failure();

    tv(&tmp)
        .args(["audit", "--problems"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 audit entries"))
        .stdout(predicate::str::contains("rejected"))
        .stdout(predicate::str::contains("vault-unlock"))
        .stdout(predicate::str::contains("forged.json"))
        .stdout(predicate::str::contains("vault-init").not());
}
