//! `trustvault cert` — issue and verify signed certificates.
//!
//! Usage:
//!   trustvault cert issue -c name=alice -c score=100 -o alice.cert.json
//!   trustvault cert verify alice.cert.json --show-claims
//!
//! Each `issue` run signs with a fresh ephemeral key; the public half is
//! embedded in the bundle.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::audit::Outcome;
use crate::certificate::{CertificateAuthority, CertificateBundle};
use crate::cli::output;
use crate::cli::{read_text, Cli, Context};
use crate::errors::{Result, TrustVaultError};

/// Execute `trustvault cert issue`.
pub fn execute_issue(
    cli: &Cli,
    claims: &[(String, Value)],
    claims_file: Option<&str>,
    output_path: Option<&str>,
) -> Result<()> {
    let ctx = Context::load(cli)?;
    let merged = merge_claims(claims_file.map(Path::new), claims)?;

    let authority = ctx.authority();
    let identity = authority.generate_identity();
    let issued = authority.issue(&Value::Object(merged), &identity)?;
    let json = issued.bundle.to_json()?;

    ctx.audit("cert-issue", Outcome::Ok, Some(&issued.did), output_path);

    match output_path {
        Some(path) => {
            std::fs::write(path, &json)?;
            output::success(&format!("Certificate written to {path}"));
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Execute `trustvault cert verify`.
///
/// Exits non-zero when the bundle does not verify.
pub fn execute_verify(cli: &Cli, file: &str, show_claims: bool) -> Result<()> {
    let ctx = Context::load(cli)?;
    let json = read_text(Path::new(file))?;

    let claims = match check_bundle(&ctx.authority(), &json) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, file, "certificate rejected");
            ctx.audit("cert-verify", Outcome::Rejected, Some(file), Some(&e.to_string()));
            return Err(TrustVaultError::IntegrityMismatch(format!(
                "certificate {file} is NOT valid"
            )));
        }
    };
    ctx.audit(
        "cert-verify",
        Outcome::Ok,
        Some(file),
        claims.get("did").and_then(Value::as_str),
    );

    output::success("Certificate signature is valid.");
    if let Some(issuer) = claims.get("issuer").and_then(Value::as_str) {
        output::info(&format!("Issuer (self-declared): {issuer}"));
    }
    if show_claims {
        let text = serde_json::to_string_pretty(&claims)
            .map_err(|e| TrustVaultError::SerializationError(format!("claims: {e}")))?;
        println!("{text}");
    }
    output::tip("A valid signature proves the bundle is unmodified, not who issued it.");
    Ok(())
}

/// Parse a serialized bundle once and return its verified claims.
fn check_bundle(authority: &CertificateAuthority, json: &str) -> Result<Map<String, Value>> {
    let bundle = CertificateBundle::from_json(json)?;
    authority.verified_claims(&bundle)
}

/// Claims from `file` (a JSON object) overlaid with `pairs`.
fn merge_claims(file: Option<&Path>, pairs: &[(String, Value)]) -> Result<Map<String, Value>> {
    let mut claims = match file {
        Some(path) => match serde_json::from_str(&read_text(path)?) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(TrustVaultError::InvalidFormat(format!(
                    "{}: claims must be a JSON object",
                    path.display()
                )))
            }
            Err(e) => {
                return Err(TrustVaultError::InvalidFormat(format!(
                    "{}: {e}",
                    path.display()
                )))
            }
        },
        None => Map::new(),
    };

    for (key, value) in pairs {
        claims.insert(key.clone(), value.clone());
    }
    Ok(claims)
}
