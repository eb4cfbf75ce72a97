//! ECDSA P-256 signatures for self-contained certificates.
//!
//! Public keys are exported as JWK objects and signatures as hex of the
//! fixed 64-byte `r || s` encoding, the same shapes WebCrypto produces, so
//! bundles issued in a browser verify here and vice versa.

use aes_gcm::aead::OsRng;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::JwkEcKey;
use p256::PublicKey;

use crate::errors::{Result, TrustVaultError};

/// An ECDSA P-256 signing keypair.
///
/// The private half never leaves this type; only the public key can be
/// exported.
pub struct SigningIdentity {
    signing_key: SigningKey,
}

impl SigningIdentity {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// The public key as a JWK JSON object.
    pub fn public_key_jwk(&self) -> serde_json::Value {
        let public_key = PublicKey::from(self.signing_key.verifying_key());
        // JwkEcKey is a plain struct of strings; serialization cannot fail.
        serde_json::to_value(public_key.to_jwk()).unwrap_or(serde_json::Value::Null)
    }

    /// Sign `message` (SHA-256 is applied internally) and return the
    /// 64-byte `r || s` signature.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(message);
        signature.to_bytes().to_vec()
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("public_key", &self.public_key_jwk())
            .finish_non_exhaustive()
    }
}

/// Import a P-256 public key from a JWK JSON value.
pub fn import_public_key(jwk: &serde_json::Value) -> Result<VerifyingKey> {
    let jwk: JwkEcKey = serde_json::from_value(jwk.clone())
        .map_err(|e| TrustVaultError::MalformedCertificate(format!("public key JWK: {e}")))?;
    let public_key = PublicKey::from_jwk(&jwk)
        .map_err(|e| TrustVaultError::MalformedCertificate(format!("public key: {e}")))?;
    Ok(VerifyingKey::from(public_key))
}

/// Check a raw `r || s` signature over `message` with a JWK public key.
pub fn verify_signature(jwk: &serde_json::Value, message: &[u8], signature: &[u8]) -> Result<bool> {
    let verifying_key = import_public_key(jwk)?;
    let signature = Signature::from_slice(signature)
        .map_err(|e| TrustVaultError::MalformedCertificate(format!("signature: {e}")))?;
    Ok(verifying_key.verify(message, &signature).is_ok())
}
