//! SHA-256 helpers shared by backups and integrity manifests.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Lowercase hex SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Compare two hex digests in constant time, ignoring ASCII case.
pub fn digest_eq(expected: &str, actual: &str) -> bool {
    let expected = expected.to_ascii_lowercase();
    let actual = actual.to_ascii_lowercase();
    expected.as_bytes().ct_eq(actual.as_bytes()).into()
}
