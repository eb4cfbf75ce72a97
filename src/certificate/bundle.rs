//! The portable certificate bundle.
//!
//! ```json
//! {
//!   "payload":   "{\"course\":\"rust-101\",\"did\":\"did:slab:…\",\"issuedAt\":\"…\",\"issuer\":\"Security Lab\"}",
//!   "signature": "<hex r||s>",
//!   "publicKey": { "kty": "EC", "crv": "P-256", "x": "…", "y": "…" }
//! }
//! ```
//!
//! `payload` is kept as the exact string that was signed; it is never
//! re-serialized before verification.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TrustVaultError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateBundle {
    /// JSON claims, exactly as signed.
    pub payload: String,
    /// Hex-encoded 64-byte ECDSA signature.
    pub signature: String,
    /// JWK of the key that produced `signature`.
    pub public_key: serde_json::Value,
}

impl CertificateBundle {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TrustVaultError::SerializationError(format!("certificate: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| TrustVaultError::MalformedCertificate(format!("bundle JSON: {e}")))
    }
}
