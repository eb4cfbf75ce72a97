//! Integration tests for the TrustVault crypto module.

use trustvault::crypto::encryption::{decrypt, encrypt, NONCE_LEN, TAG_LEN};
use trustvault::crypto::kdf::{derive_master_key, Argon2Params, KdfParams};
use trustvault::crypto::signing::verify_signature;
use trustvault::crypto::{digest_eq, generate_salt, sha256_hex, CryptoProvider, SystemCrypto};
use trustvault::errors::TrustVaultError;

fn fast() -> KdfParams {
    KdfParams::Pbkdf2Sha256 { iterations: 1_000 }
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

#[test]
fn same_inputs_derive_same_key() {
    let salt = generate_salt();
    let k1 = derive_master_key(b"passphrase-1", &salt, &fast()).unwrap();
    let k2 = derive_master_key(b"passphrase-1", &salt, &fast()).unwrap();

    // Keys are opaque; equal verifiers mean equal key material.
    assert_eq!(k1.verifier().unwrap(), k2.verifier().unwrap());
}

#[test]
fn salt_passphrase_and_params_all_matter() {
    let salt = generate_salt();
    let base = derive_master_key(b"passphrase-1", &salt, &fast())
        .unwrap()
        .verifier()
        .unwrap();

    let other_pass = derive_master_key(b"passphrase-2", &salt, &fast()).unwrap();
    let other_salt = derive_master_key(b"passphrase-1", &generate_salt(), &fast()).unwrap();
    let other_cost = derive_master_key(
        b"passphrase-1",
        &salt,
        &KdfParams::Pbkdf2Sha256 { iterations: 1_001 },
    )
    .unwrap();

    assert_ne!(base, other_pass.verifier().unwrap());
    assert_ne!(base, other_salt.verifier().unwrap());
    assert_ne!(base, other_cost.verifier().unwrap());
}

#[test]
fn argon2id_derivation_works() {
    let params = KdfParams::Argon2id(Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    });
    let salt = generate_salt();
    let k1 = derive_master_key(b"passphrase-1", &salt, &params).unwrap();
    let k2 = derive_master_key(b"passphrase-1", &salt, &fast()).unwrap();
    assert_ne!(k1.verifier().unwrap(), k2.verifier().unwrap());
}

#[test]
fn weak_cost_parameters_are_refused() {
    let err = derive_master_key(
        b"passphrase-1",
        &generate_salt(),
        &KdfParams::Pbkdf2Sha256 { iterations: 1 },
    )
    .err()
    .unwrap();
    assert!(matches!(err, TrustVaultError::KeyDerivationFailed(_)));
}

// ---------------------------------------------------------------------------
// Authenticated encryption
// ---------------------------------------------------------------------------

#[test]
fn encrypt_decrypt_roundtrip_through_provider() {
    let crypto = SystemCrypto;
    let salt = crypto.random_bytes(16);
    let key = crypto
        .derive_key(b"passphrase-1", &salt, &fast())
        .unwrap()
        .derive_aead_key()
        .unwrap();

    let sealed = crypto.aead_encrypt(&key, b"course progress", b"aad").unwrap();
    assert_eq!(sealed.len(), NONCE_LEN + b"course progress".len() + TAG_LEN);
    assert_eq!(
        crypto.aead_decrypt(&key, &sealed, b"aad").unwrap(),
        b"course progress"
    );
}

#[test]
fn nonces_never_repeat() {
    let key = derive_master_key(b"passphrase-1", &generate_salt(), &fast())
        .unwrap()
        .derive_aead_key()
        .unwrap();

    let mut nonces = std::collections::HashSet::new();
    for _ in 0..200 {
        let sealed = encrypt(&key, b"same plaintext", b"").unwrap();
        assert!(nonces.insert(sealed[..NONCE_LEN].to_vec()), "nonce reused");
    }
}

#[test]
fn wrong_key_truncation_and_flips_all_look_alike() {
    let salt = generate_salt();
    let key = derive_master_key(b"passphrase-1", &salt, &fast())
        .unwrap()
        .derive_aead_key()
        .unwrap();
    let wrong = derive_master_key(b"passphrase-2", &salt, &fast())
        .unwrap()
        .derive_aead_key()
        .unwrap();
    let sealed = encrypt(&key, b"secret", b"ctx").unwrap();

    let mut flipped = sealed.clone();
    flipped[NONCE_LEN] ^= 0x01;

    for result in [
        decrypt(&wrong, &sealed, b"ctx"),
        decrypt(&key, &sealed, b"other"),
        decrypt(&key, &sealed[..NONCE_LEN + 4], b"ctx"),
        decrypt(&key, &flipped, b"ctx"),
    ] {
        assert!(matches!(
            result,
            Err(TrustVaultError::InvalidPassphraseOrCorruptedData)
        ));
    }
}

// ---------------------------------------------------------------------------
// Hashing and signatures
// ---------------------------------------------------------------------------

#[test]
fn hex_digest_comparison_ignores_case() {
    let digest = sha256_hex(b"index.html");
    assert!(digest_eq(&digest.to_uppercase(), &digest));
    assert!(!digest_eq(&digest, &sha256_hex(b"index.htm")));
    assert!(!digest_eq(&digest, &digest[..10]));
}

#[test]
fn provider_signatures_verify_against_jwk() {
    let crypto = SystemCrypto;
    let identity = crypto.generate_signing_identity();
    let sig = crypto.sign(&identity, b"payload");

    assert_eq!(sig.len(), 64);
    assert!(crypto.verify(&identity.public_key_jwk(), b"payload", &sig).unwrap());
    assert!(!verify_signature(&identity.public_key_jwk(), b"payloaD", &sig).unwrap());
}
