//! Issue and verify self-contained achievement certificates.
//!
//! The verifying public key travels inside every bundle, so verification
//! needs no registry or network. The flip side: a valid bundle only proves
//! that *someone* holding the matching private key signed it. Identities
//! are ephemeral, one per signing session, so there is no notion of a
//! recognised issuer here.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::bundle::CertificateBundle;
use crate::crypto::{CryptoProvider, SigningIdentity};
use crate::errors::{Result, TrustVaultError};

/// Issuer name written into every payload unless overridden.
pub const DEFAULT_ISSUER: &str = "Security Lab";

/// Prefix of the unique identifier added to every payload.
pub const DID_PREFIX: &str = "did:slab:";

/// Claim names the authority sets itself; caller values are overwritten.
pub const RESERVED_CLAIMS: &[&str] = &["issuedAt", "issuer", "did"];

/// A freshly signed bundle together with the identifier it carries.
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    pub bundle: CertificateBundle,
    pub did: String,
}

pub struct CertificateAuthority {
    crypto: Arc<dyn CryptoProvider>,
    issuer: String,
}

impl CertificateAuthority {
    pub fn new(crypto: Arc<dyn CryptoProvider>) -> Self {
        Self {
            crypto,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Fresh ephemeral signing keypair.
    pub fn generate_identity(&self) -> SigningIdentity {
        self.crypto.generate_signing_identity()
    }

    /// Sign `claims` (a JSON object) and return the bundle.
    ///
    /// `issuedAt`, `issuer` and a fresh `did` are added to the claims.
    /// The payload is serialized with sorted keys.
    pub fn sign(&self, claims: &Value, identity: &SigningIdentity) -> Result<CertificateBundle> {
        self.issue(claims, identity).map(|issued| issued.bundle)
    }

    /// `sign`, also handing back the `did` written into the payload.
    pub fn issue(&self, claims: &Value, identity: &SigningIdentity) -> Result<IssuedCertificate> {
        let Value::Object(claims) = claims else {
            return Err(TrustVaultError::InvalidFormat(
                "certificate claims must be a JSON object".into(),
            ));
        };

        let mut payload_claims: Map<String, Value> = claims.clone();
        let did = format!("{DID_PREFIX}{}", uuid::Uuid::new_v4());
        payload_claims.insert(
            "issuedAt".into(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        payload_claims.insert("issuer".into(), Value::String(self.issuer.clone()));
        payload_claims.insert("did".into(), Value::String(did.clone()));

        let payload = serde_json::to_string(&Value::Object(payload_claims))
            .map_err(|e| TrustVaultError::SerializationError(format!("certificate claims: {e}")))?;

        let signature = self.crypto.sign(identity, payload.as_bytes());

        info!(did = %did, issuer = %self.issuer, "certificate issued");
        Ok(IssuedCertificate {
            bundle: CertificateBundle {
                payload,
                signature: hex::encode(signature),
                public_key: identity.public_key_jwk(),
            },
            did,
        })
    }

    /// `true` only if the embedded key verifies the signature over the
    /// exact payload string. Any malformed piece yields `false`.
    pub fn verify(&self, bundle: &CertificateBundle) -> bool {
        match self.check(bundle) {
            Ok(valid) => {
                if !valid {
                    warn!("certificate signature does not verify");
                }
                valid
            }
            Err(e) => {
                debug!(error = %e, "certificate rejected as malformed");
                false
            }
        }
    }

    /// `verify` over a serialized bundle.
    pub fn verify_json(&self, json: &str) -> bool {
        CertificateBundle::from_json(json).is_ok_and(|bundle| self.verify(&bundle))
    }

    /// The signed claims, after a successful verification.
    pub fn verified_claims(&self, bundle: &CertificateBundle) -> Result<Map<String, Value>> {
        if !self.check(bundle)? {
            return Err(TrustVaultError::IntegrityMismatch(
                "certificate signature does not verify".into(),
            ));
        }
        match serde_json::from_str(&bundle.payload) {
            Ok(Value::Object(claims)) => Ok(claims),
            Ok(_) => Err(TrustVaultError::MalformedCertificate(
                "payload is not a JSON object".into(),
            )),
            Err(e) => Err(TrustVaultError::MalformedCertificate(format!("payload: {e}"))),
        }
    }

    fn check(&self, bundle: &CertificateBundle) -> Result<bool> {
        let signature = hex::decode(bundle.signature.trim())
            .map_err(|e| TrustVaultError::MalformedCertificate(format!("signature hex: {e}")))?;
        self.crypto
            .verify(&bundle.public_key, bundle.payload.as_bytes(), &signature)
    }
}
