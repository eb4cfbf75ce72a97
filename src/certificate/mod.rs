//! Certificate module — self-sovereign achievement credentials.
//!
//! - The serialized bundle (`bundle`)
//! - Issuance and verification (`authority`)

pub mod authority;
pub mod bundle;

pub use authority::{
    CertificateAuthority, IssuedCertificate, DEFAULT_ISSUER, DID_PREFIX, RESERVED_CLAIMS,
};
pub use bundle::CertificateBundle;
