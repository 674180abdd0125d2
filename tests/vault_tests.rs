//! Integration tests for the OpenTerm vault module.

use std::fs;

use openterm::crypto::KdfParams;
use openterm::errors::OpenTermError;
use openterm::vault::{
    CredentialVault, PasswordExport, VaultEnvelope, VaultFileStore, VaultLifecycle,
};
use tempfile::TempDir;

const CONN_A: &str = "3f2b8c1e-5d4a-4e7b-9c0d-1a2b3c4d5e6f";
const CONN_B: &str = "a1b2c3d4-e5f6-4a7b-8c9d-0e1f2a3b4c5d";

/// Fast derivation so the suite does not spend its time hashing.
fn fast_kdf() -> KdfParams {
    KdfParams::sha256(100)
}

/// Helper: an unconfigured vault inside a fresh temp dir.
fn new_vault() -> (TempDir, CredentialVault) {
    let dir = TempDir::new().expect("create temp dir");
    let vault = CredentialVault::open(VaultFileStore::in_dir(dir.path()), fast_kdf())
        .expect("open vault");
    (dir, vault)
}

fn reopen(dir: &TempDir) -> CredentialVault {
    CredentialVault::open(VaultFileStore::in_dir(dir.path()), fast_kdf()).expect("reopen vault")
}

fn read_envelope(dir: &TempDir) -> VaultEnvelope {
    VaultFileStore::in_dir(dir.path())
        .read()
        .expect("read envelope")
        .expect("envelope exists")
}

// ---------------------------------------------------------------------------
// Configure
// ---------------------------------------------------------------------------

#[test]
fn configure_creates_unlocked_empty_vault() {
    let (dir, mut vault) = new_vault();
    assert_eq!(vault.lifecycle(), VaultLifecycle::Unconfigured);

    vault.configure("master", "master").unwrap();

    assert_eq!(vault.lifecycle(), VaultLifecycle::Unlocked);
    assert!(vault.saved_connection_ids().is_empty());
    assert!(dir.path().join("vault.json").exists());
}

#[test]
fn configure_mismatch_stays_unconfigured() {
    let (dir, mut vault) = new_vault();

    let result = vault.configure("master", "mastr");
    assert!(matches!(result, Err(OpenTermError::PasswordMismatch)));
    assert_eq!(vault.lifecycle(), VaultLifecycle::Unconfigured);
    assert!(!dir.path().join("vault.json").exists());
}

#[test]
fn configure_rejects_empty_password() {
    let (_dir, mut vault) = new_vault();
    let result = vault.configure("", "");
    assert!(matches!(result, Err(OpenTermError::EmptyPassword)));
}

#[test]
fn configure_twice_fails() {
    let (_dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.lock();

    let result = vault.configure("other", "other");
    assert!(matches!(result, Err(OpenTermError::AlreadyConfigured(_))));
}

// ---------------------------------------------------------------------------
// Unlock / lock
// ---------------------------------------------------------------------------

#[test]
fn store_lock_unlock_recovers_passwords() {
    let (dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.store_password(CONN_A, "s3cret").unwrap();
    vault.lock();

    assert!(matches!(vault.password(CONN_A), Err(OpenTermError::VaultLocked)));

    vault.unlock("master").unwrap();
    assert_eq!(vault.password(CONN_A).unwrap(), Some("s3cret"));

    // A fresh process sees the same data.
    let mut again = reopen(&dir);
    assert_eq!(again.lifecycle(), VaultLifecycle::Locked);
    again.unlock("master").unwrap();
    assert_eq!(again.password(CONN_A).unwrap(), Some("s3cret"));
}

#[test]
fn wrong_password_leaves_file_untouched() {
    let (dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.store_password(CONN_A, "s3cret").unwrap();
    vault.lock();

    let before = fs::read(dir.path().join("vault.json")).unwrap();
    let result = vault.unlock("wrong");
    let after = fs::read(dir.path().join("vault.json")).unwrap();

    assert!(matches!(result, Err(OpenTermError::InvalidMasterPassword)));
    assert_eq!(before, after);
    assert_eq!(vault.lifecycle(), VaultLifecycle::Locked);
}

#[test]
fn unlock_unconfigured_fails() {
    let (_dir, mut vault) = new_vault();
    assert!(matches!(vault.unlock("x"), Err(OpenTermError::NotConfigured)));
}

#[test]
fn saved_ids_visible_while_locked() {
    let (dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.store_password(CONN_A, "a").unwrap();
    vault.store_password(CONN_B, "b").unwrap();
    drop(vault);

    let vault = reopen(&dir);
    assert_eq!(vault.lifecycle(), VaultLifecycle::Locked);
    let ids: Vec<&str> = vault
        .saved_connection_ids()
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(ids, [CONN_A, CONN_B]);
    assert_eq!(vault.status().saved_count, 2);
}

#[test]
fn envelope_lists_connection_ids_sorted() {
    let (dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.store_password(CONN_B, "b").unwrap();
    vault.store_password(CONN_A, "a").unwrap();

    let envelope = read_envelope(&dir);
    assert_eq!(envelope.connection_ids(), [CONN_A, CONN_B]);
}

// ---------------------------------------------------------------------------
// Entry operations
// ---------------------------------------------------------------------------

#[test]
fn store_password_rejects_non_uuid() {
    let (_dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();

    let result = vault.store_password("not-a-uuid", "x");
    assert!(matches!(result, Err(OpenTermError::InvalidConnectionId(_))));
}

#[test]
fn remove_password_reports_existence() {
    let (_dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.store_password(CONN_A, "a").unwrap();

    assert!(vault.remove_password(CONN_A).unwrap());
    assert!(!vault.remove_password(CONN_A).unwrap());
    assert_eq!(vault.password(CONN_A).unwrap(), None);
}

#[test]
fn remove_all_empties_vault() {
    let (dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.store_password(CONN_A, "a").unwrap();
    vault.store_password(CONN_B, "b").unwrap();

    vault.remove_all().unwrap();

    assert!(vault.saved_connection_ids().is_empty());
    assert!(read_envelope(&dir).connection_ids().is_empty());
}

#[test]
fn entry_operations_require_unlock() {
    let (_dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.lock();

    assert!(matches!(
        vault.store_password(CONN_A, "a"),
        Err(OpenTermError::VaultLocked)
    ));
    assert!(matches!(vault.remove_all(), Err(OpenTermError::VaultLocked)));
}

// ---------------------------------------------------------------------------
// Change master password
// ---------------------------------------------------------------------------

#[test]
fn change_password_resalts_and_rekeys() {
    let (dir, mut vault) = new_vault();
    vault.configure("old-pw", "old-pw").unwrap();
    vault.store_password(CONN_A, "a").unwrap();
    let old_salt = read_envelope(&dir).salt;

    vault.change_master_password("old-pw", "new-pw", "new-pw").unwrap();
    assert_eq!(vault.lifecycle(), VaultLifecycle::Unlocked);
    assert_ne!(read_envelope(&dir).salt, old_salt);

    let mut again = reopen(&dir);
    assert!(matches!(
        again.unlock("old-pw"),
        Err(OpenTermError::InvalidMasterPassword)
    ));
    again.unlock("new-pw").unwrap();
    assert_eq!(again.password(CONN_A).unwrap(), Some("a"));
}

#[test]
fn change_password_with_wrong_current_changes_nothing() {
    let (dir, mut vault) = new_vault();
    vault.configure("old-pw", "old-pw").unwrap();
    vault.lock();
    let before = fs::read(dir.path().join("vault.json")).unwrap();

    let result = vault.change_master_password("nope", "new-pw", "new-pw");
    assert!(matches!(result, Err(OpenTermError::InvalidMasterPassword)));
    assert_eq!(vault.lifecycle(), VaultLifecycle::Locked);
    assert_eq!(before, fs::read(dir.path().join("vault.json")).unwrap());
}

#[test]
fn change_password_mismatch_is_rejected() {
    let (_dir, mut vault) = new_vault();
    vault.configure("old-pw", "old-pw").unwrap();

    let result = vault.change_master_password("old-pw", "new-pw", "new-px");
    assert!(matches!(result, Err(OpenTermError::PasswordMismatch)));
}

// ---------------------------------------------------------------------------
// Export / import
// ---------------------------------------------------------------------------

fn export_of(pairs: &[(&str, &str)]) -> PasswordExport {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn export_does_not_change_lock_state() {
    let (_dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.store_password(CONN_A, "a").unwrap();
    vault.lock();

    let export = vault.export_passwords("master").expect("export");
    assert_eq!(export.passwords.get(CONN_A).map(String::as_str), Some("a"));
    assert_eq!(vault.lifecycle(), VaultLifecycle::Locked);

    assert!(vault.export_passwords("wrong").is_none());
}

#[test]
fn import_merges_with_imported_values_winning() {
    let (_dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.store_password(CONN_A, "old").unwrap();

    let count = vault
        .import_passwords(&export_of(&[(CONN_A, "new"), (CONN_B, "b")]), "master")
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(vault.password(CONN_A).unwrap(), Some("new"));
    assert_eq!(vault.password(CONN_B).unwrap(), Some("b"));
}

#[test]
fn import_into_locked_vault_relocks() {
    let (_dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.lock();

    vault
        .import_passwords(&export_of(&[(CONN_A, "a")]), "master")
        .unwrap();

    assert_eq!(vault.lifecycle(), VaultLifecycle::Locked);
    assert!(vault.saved_connection_ids().contains(CONN_A));
}

#[test]
fn import_into_unconfigured_vault_configures_it() {
    let (_dir, mut vault) = new_vault();

    vault
        .import_passwords(&export_of(&[(CONN_A, "a")]), "master")
        .unwrap();

    assert_eq!(vault.lifecycle(), VaultLifecycle::Unlocked);
    assert_eq!(vault.password(CONN_A).unwrap(), Some("a"));
}

#[test]
fn import_with_wrong_master_changes_nothing() {
    let (dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    let before = fs::read(dir.path().join("vault.json")).unwrap();

    let result = vault.import_passwords(&export_of(&[(CONN_A, "a")]), "wrong");
    assert!(matches!(result, Err(OpenTermError::InvalidMasterPassword)));
    assert_eq!(before, fs::read(dir.path().join("vault.json")).unwrap());
}

#[test]
fn import_rejects_invalid_ids_before_touching_the_vault() {
    let (_dir, mut vault) = new_vault();

    let result = vault.import_passwords(&export_of(&[("bogus", "a")]), "master");
    assert!(matches!(result, Err(OpenTermError::InvalidConnectionId(_))));
    assert_eq!(vault.lifecycle(), VaultLifecycle::Unconfigured);
}

// ---------------------------------------------------------------------------
// Failed writes
// ---------------------------------------------------------------------------

/// Occupy the atomic-write temp path with a directory so every save fails.
fn block_writes(dir: &TempDir) {
    fs::create_dir(dir.path().join(".vault.json.tmp")).unwrap();
}

#[test]
fn failed_write_leaves_file_and_memory_unchanged() {
    let (dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.store_password(CONN_A, "old").unwrap();
    let ids_before = vault.saved_connection_ids().clone();
    let bytes_before = fs::read(dir.path().join("vault.json")).unwrap();

    block_writes(&dir);

    let result = vault.store_password(CONN_A, "new");
    assert!(matches!(result, Err(OpenTermError::Io(_))));
    let result = vault.store_password(CONN_B, "b");
    assert!(matches!(result, Err(OpenTermError::Io(_))));
    let result = vault.remove_all();
    assert!(matches!(result, Err(OpenTermError::Io(_))));

    assert_eq!(vault.password(CONN_A).unwrap(), Some("old"));
    assert_eq!(vault.password(CONN_B).unwrap(), None);
    assert_eq!(vault.saved_connection_ids(), &ids_before);
    assert_eq!(vault.lifecycle(), VaultLifecycle::Unlocked);
    assert_eq!(bytes_before, fs::read(dir.path().join("vault.json")).unwrap());
}

#[test]
fn failed_import_into_locked_vault_still_relocks() {
    let (dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.lock();
    let bytes_before = fs::read(dir.path().join("vault.json")).unwrap();

    block_writes(&dir);

    let result = vault.import_passwords(&export_of(&[(CONN_A, "a")]), "master");
    assert!(matches!(result, Err(OpenTermError::Io(_))));
    assert_eq!(vault.lifecycle(), VaultLifecycle::Locked);
    assert!(vault.saved_connection_ids().is_empty());
    assert_eq!(bytes_before, fs::read(dir.path().join("vault.json")).unwrap());
}

// ---------------------------------------------------------------------------
// Status channel
// ---------------------------------------------------------------------------

#[test]
fn status_channel_tracks_lifecycle() {
    let (_dir, mut vault) = new_vault();
    let rx = vault.subscribe();

    vault.configure("master", "master").unwrap();
    vault.store_password(CONN_A, "a").unwrap();
    assert!(rx.borrow().is_unlocked());
    assert_eq!(rx.borrow().saved_count, 1);

    vault.lock();
    assert!(!rx.borrow().is_unlocked());
    assert!(rx.borrow().is_configured());
}

// ---------------------------------------------------------------------------
// Legacy envelopes
// ---------------------------------------------------------------------------

#[test]
fn reads_envelope_without_kdf_or_ids() {
    let (dir, mut vault) = new_vault();
    vault.configure("master", "master").unwrap();
    vault.store_password(CONN_A, "a").unwrap();
    drop(vault);

    // Strip the optional fields and rename the tag the way older files spell it.
    let path = dir.path().join("vault.json");
    let mut json: serde_json::Value =
        serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    let obj = json.as_object_mut().unwrap();
    obj.remove("connectionIds");
    obj.remove("kdf");
    let tag = obj.remove("tag").unwrap();
    obj.insert("authTag".into(), tag);
    fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();

    let mut vault = reopen(&dir);
    assert!(vault.saved_connection_ids().is_empty());
    vault.unlock("master").unwrap();
    assert_eq!(vault.password(CONN_A).unwrap(), Some("a"));
    assert!(vault.saved_connection_ids().contains(CONN_A));
}
