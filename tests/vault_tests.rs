//! Integration tests for the TrustVault vault module.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use trustvault::crypto::kdf::KdfParams;
use trustvault::crypto::{AeadKey, CryptoProvider, MasterKey, SigningIdentity, SystemCrypto};
use trustvault::errors::{Result, TrustVaultError};
use trustvault::storage::{
    FileStore, KeyValueStore, MemoryStore, VAULT_BLOB_KEY, VAULT_VERIFIER_KEY,
};
use trustvault::vault::{VaultBlob, VaultData, VaultState, VaultStore};

/// Cheap KDF settings so the suite stays fast.
fn fast_kdf() -> KdfParams {
    KdfParams::Pbkdf2Sha256 { iterations: 1_000 }
}

fn memory_vault() -> (Arc<MemoryStore>, VaultStore) {
    let store = Arc::new(MemoryStore::new());
    let vault = VaultStore::new(store.clone(), SystemCrypto::shared()).with_kdf(fast_kdf());
    (store, vault)
}

fn sample_data() -> VaultData {
    let mut data = VaultData::default();
    data.progress.insert("c1".into(), json!(40));
    data.notes.insert("n1".into(), "remember the nonce".into());
    data.preferences.insert("theme".into(), json!("dark"));
    data
}

fn blob(store: &MemoryStore) -> VaultBlob {
    VaultBlob::decode(&store.get(VAULT_BLOB_KEY).unwrap().unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn create_lock_unlock_with_default_kdf() {
    let store = Arc::new(MemoryStore::new());
    let mut vault = VaultStore::new(store.clone(), SystemCrypto::shared());

    let mut initial = VaultData::default();
    initial.progress.insert("course-1".into(), json!(50));

    vault.create("correcthorse1", initial.clone()).unwrap();
    assert_eq!(vault.state().unwrap(), VaultState::Unlocked);
    vault.lock();
    assert_eq!(vault.state().unwrap(), VaultState::Locked);

    let data = vault.unlock("correcthorse1").unwrap();
    assert_eq!(data, initial);
    assert_eq!(data.progress["course-1"], 50);
    assert!(data.notes.is_empty());
    assert!(data.preferences.is_empty());
    assert!(store.get(VAULT_BLOB_KEY).unwrap().unwrap().starts_with("pbkdf2-sha256:i=100000$"));

    vault.lock();
    assert!(matches!(
        vault.unlock("wrong"),
        Err(TrustVaultError::InvalidPassphraseOrCorruptedData)
    ));
    assert_eq!(vault.state().unwrap(), VaultState::Locked);
    assert!(matches!(vault.data(), Err(TrustVaultError::VaultLocked)));
}

#[test]
fn save_then_reopen_in_a_new_handle() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());

    let mut vault = VaultStore::new(store.clone(), SystemCrypto::shared()).with_kdf(fast_kdf());
    vault.create("passphrase-1", VaultData::default()).unwrap();
    vault.save(sample_data()).unwrap();
    drop(vault);

    let mut reopened = VaultStore::new(store, SystemCrypto::shared());
    assert_eq!(reopened.state().unwrap(), VaultState::Locked);
    assert_eq!(reopened.unlock("passphrase-1").unwrap(), sample_data());
}

#[test]
fn create_rejects_weak_passphrase_and_persists_nothing() {
    let (store, mut vault) = memory_vault();

    assert!(matches!(
        vault.create("short", VaultData::default()),
        Err(TrustVaultError::WeakPassphrase(8))
    ));
    assert!(store.get(VAULT_BLOB_KEY).unwrap().is_none());
    assert_eq!(vault.state().unwrap(), VaultState::NonExistent);
}

#[test]
fn create_twice_fails() {
    let (_store, mut vault) = memory_vault();
    vault.create("passphrase-1", VaultData::default()).unwrap();
    assert!(matches!(
        vault.create("passphrase-2", VaultData::default()),
        Err(TrustVaultError::VaultAlreadyExists)
    ));
}

#[test]
fn unlock_without_vault_fails() {
    let (_store, mut vault) = memory_vault();
    assert!(matches!(
        vault.unlock("passphrase-1"),
        Err(TrustVaultError::VaultNotFound)
    ));
}

#[test]
fn save_requires_unlock() {
    let (_store, mut vault) = memory_vault();
    vault.create("passphrase-1", VaultData::default()).unwrap();
    vault.lock();
    assert!(matches!(
        vault.save(sample_data()),
        Err(TrustVaultError::VaultLocked)
    ));
}

#[test]
fn destroy_removes_blob_and_verifier() {
    let (store, mut vault) = memory_vault();
    vault.create("passphrase-1", sample_data()).unwrap();
    assert!(store.get(VAULT_VERIFIER_KEY).unwrap().is_some());

    vault.destroy().unwrap();
    assert_eq!(vault.state().unwrap(), VaultState::NonExistent);
    assert!(store.get(VAULT_BLOB_KEY).unwrap().is_none());
    assert!(store.get(VAULT_VERIFIER_KEY).unwrap().is_none());
    assert!(matches!(
        vault.unlock("passphrase-1"),
        Err(TrustVaultError::VaultNotFound)
    ));
}

// ---------------------------------------------------------------------------
// Confidentiality and integrity of the blob
// ---------------------------------------------------------------------------

#[test]
fn blob_does_not_contain_plaintext() {
    let (store, mut vault) = memory_vault();
    vault.create("passphrase-1", sample_data()).unwrap();

    let raw = store.get(VAULT_BLOB_KEY).unwrap().unwrap();
    assert!(!raw.contains("remember the nonce"));
    assert!(!raw.contains("theme"));
}

#[test]
fn every_save_uses_a_fresh_nonce() {
    let (store, mut vault) = memory_vault();
    vault.create("passphrase-1", sample_data()).unwrap();
    let first = blob(&store);

    vault.save(sample_data()).unwrap();
    let second = blob(&store);

    assert_eq!(first.salt, second.salt);
    assert_ne!(first.nonce(), second.nonce());
    assert_ne!(first.sealed, second.sealed);
}

#[test]
fn any_flipped_ciphertext_bit_is_rejected() {
    let (store, mut vault) = memory_vault();
    vault.create("passphrase-1", sample_data()).unwrap();
    vault.lock();
    let original = blob(&store);

    for index in [0, 12, original.sealed.len() / 2, original.sealed.len() - 1] {
        let mut tampered = original.clone();
        tampered.sealed[index] ^= 0x01;
        store.set(VAULT_BLOB_KEY, &tampered.encode()).unwrap();

        assert!(
            matches!(
                vault.unlock("passphrase-1"),
                Err(TrustVaultError::InvalidPassphraseOrCorruptedData)
            ),
            "flip at byte {index} was accepted"
        );
        assert!(!vault.is_unlocked());
    }
}

#[test]
fn tampered_salt_or_kdf_descriptor_is_rejected() {
    let (store, mut vault) = memory_vault();
    vault.create("passphrase-1", sample_data()).unwrap();
    vault.lock();
    let original = blob(&store);

    let mut salted = original.clone();
    salted.salt[0] ^= 0x80;
    store.set(VAULT_BLOB_KEY, &salted.encode()).unwrap();
    assert!(vault.unlock("passphrase-1").is_err());

    let mut rekdf = original;
    rekdf.kdf = KdfParams::Pbkdf2Sha256 { iterations: 1_001 };
    store.set(VAULT_BLOB_KEY, &rekdf.encode()).unwrap();
    assert!(matches!(
        vault.unlock("passphrase-1"),
        Err(TrustVaultError::InvalidPassphraseOrCorruptedData)
    ));
}

#[test]
fn oversized_kdf_descriptor_fails_before_deriving() {
    let crypto = Arc::new(CountingCrypto::default());
    let store = Arc::new(MemoryStore::new());
    let mut vault = VaultStore::new(store.clone(), crypto.clone()).with_kdf(fast_kdf());
    vault.create("passphrase-1", sample_data()).unwrap();
    vault.lock();

    let encoded = store.get(VAULT_BLOB_KEY).unwrap().unwrap();
    let body = encoded.strip_prefix("pbkdf2-sha256:i=1000").unwrap();
    let before = crypto.derivations.load(Ordering::SeqCst);

    for huge in ["argon2id:m=4294967295,t=1,p=1", "pbkdf2-sha256:i=4294967295"] {
        store.set(VAULT_BLOB_KEY, &format!("{huge}{body}")).unwrap();
        assert!(matches!(
            vault.unlock("passphrase-1"),
            Err(TrustVaultError::InvalidPassphraseOrCorruptedData)
        ));
        assert!(!vault.verify_passphrase("passphrase-1").unwrap());
    }
    assert_eq!(crypto.derivations.load(Ordering::SeqCst), before);
}

#[test]
fn garbage_blob_reads_as_wrong_passphrase() {
    let (store, mut vault) = memory_vault();
    store.set(VAULT_BLOB_KEY, "definitely not a vault").unwrap();
    assert!(matches!(
        vault.unlock("passphrase-1"),
        Err(TrustVaultError::InvalidPassphraseOrCorruptedData)
    ));
}

// ---------------------------------------------------------------------------
// Passphrase helpers
// ---------------------------------------------------------------------------

#[test]
fn verify_passphrase_is_a_hint_only() {
    let (store, mut vault) = memory_vault();
    vault.create("passphrase-1", sample_data()).unwrap();
    vault.lock();

    assert!(vault.verify_passphrase("passphrase-1").unwrap());
    assert!(!vault.verify_passphrase("passphrase-2").unwrap());

    // Unlock never consults the verifier.
    store.set(VAULT_VERIFIER_KEY, "00").unwrap();
    assert!(!vault.verify_passphrase("passphrase-1").unwrap());
    assert_eq!(vault.unlock("passphrase-1").unwrap(), sample_data());
}

#[test]
fn change_passphrase_rekeys_the_vault() {
    let (store, mut vault) = memory_vault();
    vault.create("passphrase-1", sample_data()).unwrap();
    let before = blob(&store);

    vault.change_passphrase("passphrase-2").unwrap();
    let after = blob(&store);
    assert_ne!(before.salt, after.salt);

    vault.lock();
    assert!(vault.unlock("passphrase-1").is_err());
    assert_eq!(vault.unlock("passphrase-2").unwrap(), sample_data());
    assert!(vault.verify_passphrase("passphrase-2").unwrap());
}

#[test]
fn change_passphrase_requires_unlock_and_strength() {
    let (_store, mut vault) = memory_vault();
    vault.create("passphrase-1", sample_data()).unwrap();
    assert!(matches!(
        vault.change_passphrase("short"),
        Err(TrustVaultError::WeakPassphrase(_))
    ));

    vault.lock();
    assert!(matches!(
        vault.change_passphrase("passphrase-2"),
        Err(TrustVaultError::VaultLocked)
    ));
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Store whose writes can be switched off.
struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TrustVaultError::Storage("disk full".into()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys()
    }
}

#[test]
fn failed_save_keeps_previous_state() {
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::new(),
        fail_writes: AtomicBool::new(false),
    });
    let mut vault = VaultStore::new(store.clone(), SystemCrypto::shared()).with_kdf(fast_kdf());
    vault.create("passphrase-1", VaultData::default()).unwrap();

    store.fail_writes.store(true, Ordering::SeqCst);
    assert!(matches!(
        vault.save(sample_data()),
        Err(TrustVaultError::Storage(_))
    ));
    assert_eq!(vault.data().unwrap(), &VaultData::default());

    store.fail_writes.store(false, Ordering::SeqCst);
    vault.lock();
    assert_eq!(vault.unlock("passphrase-1").unwrap(), VaultData::default());
}

/// Provider that counts key derivations and delegates everything else.
/// `short_random` makes it hand back one byte fewer than asked for.
#[derive(Default)]
struct CountingCrypto {
    derivations: AtomicUsize,
    short_random: bool,
}

impl CryptoProvider for CountingCrypto {
    fn random_bytes(&self, n: usize) -> Vec<u8> {
        let mut bytes = SystemCrypto.random_bytes(n);
        if self.short_random {
            bytes.pop();
        }
        bytes
    }

    fn derive_key(&self, passphrase: &[u8], salt: &[u8], params: &KdfParams) -> Result<MasterKey> {
        self.derivations.fetch_add(1, Ordering::SeqCst);
        SystemCrypto.derive_key(passphrase, salt, params)
    }

    fn aead_encrypt(&self, key: &AeadKey, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        SystemCrypto.aead_encrypt(key, plaintext, aad)
    }

    fn aead_decrypt(&self, key: &AeadKey, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        SystemCrypto.aead_decrypt(key, sealed, aad)
    }

    fn hash(&self, data: &[u8]) -> [u8; 32] {
        SystemCrypto.hash(data)
    }

    fn generate_signing_identity(&self) -> SigningIdentity {
        SystemCrypto.generate_signing_identity()
    }

    fn sign(&self, identity: &SigningIdentity, message: &[u8]) -> Vec<u8> {
        SystemCrypto.sign(identity, message)
    }

    fn verify(&self, public_key: &serde_json::Value, message: &[u8], signature: &[u8]) -> Result<bool> {
        SystemCrypto.verify(public_key, message, signature)
    }
}

#[test]
fn vault_uses_the_injected_provider() {
    let crypto = Arc::new(CountingCrypto::default());
    let mut vault =
        VaultStore::new(Arc::new(MemoryStore::new()), crypto.clone()).with_kdf(fast_kdf());

    vault.create("passphrase-1", sample_data()).unwrap();
    vault.save(sample_data()).unwrap();
    vault.lock();
    vault.unlock("passphrase-1").unwrap();

    // One derivation at create, none at save, one at unlock.
    assert_eq!(crypto.derivations.load(Ordering::SeqCst), 2);
}

#[test]
fn short_salt_from_provider_is_an_error() {
    let crypto = Arc::new(CountingCrypto {
        short_random: true,
        ..CountingCrypto::default()
    });
    let store = Arc::new(MemoryStore::new());
    let mut vault = VaultStore::new(store.clone(), crypto.clone()).with_kdf(fast_kdf());

    assert!(matches!(
        vault.create("passphrase-1", sample_data()),
        Err(TrustVaultError::KeyDerivationFailed(_))
    ));
    assert!(!vault.is_unlocked());
    assert!(store.get(VAULT_BLOB_KEY).unwrap().is_none());
    assert_eq!(crypto.derivations.load(Ordering::SeqCst), 0);
}
