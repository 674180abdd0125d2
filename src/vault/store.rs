//! The credential vault state machine.
//!
//! `CredentialVault` wraps the envelope codec and the file store and
//! enforces the `Unconfigured -> Unlocked <-> Locked` lifecycle.  Every
//! mutating operation encrypts the complete new payload in memory, writes
//! it with a single atomic replace, and only then commits the new entries
//! to memory.  A failure at any point therefore leaves both the file and
//! the in-memory state exactly as they were.

use std::collections::BTreeSet;
use std::path::Path;

use subtle::ConstantTimeEq;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::envelope::{self, VaultEnvelope};
use super::file_store::VaultFileStore;
use super::payload::{PasswordExport, VaultPayload};
use crate::crypto::kdf::{generate_salt, KdfParams};
use crate::crypto::VaultKey;
use crate::errors::{OpenTermError, Result};

/// Coarse lifecycle state, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultLifecycle {
    Unconfigured,
    Locked,
    Unlocked,
}

/// Snapshot published to subscribers after every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultStatus {
    pub lifecycle: VaultLifecycle,
    pub saved_count: usize,
}

impl VaultStatus {
    pub fn is_configured(&self) -> bool {
        self.lifecycle != VaultLifecycle::Unconfigured
    }

    pub fn is_unlocked(&self) -> bool {
        self.lifecycle == VaultLifecycle::Unlocked
    }
}

/// Key material and plaintext that only exist while unlocked.
struct UnlockedVault {
    key: VaultKey,
    salt: Vec<u8>,
    kdf: KdfParams,
    entries: VaultPayload,
}

enum VaultState {
    Unconfigured,
    Locked,
    Unlocked(UnlockedVault),
}

/// The main vault handle.
///
/// All methods take `&mut self`, so the borrow checker enforces the
/// single-writer rule within one owner.  Share it across threads behind a
/// `Mutex` (or keep it on one task) to serialize mutations.
pub struct CredentialVault {
    file: VaultFileStore,

    /// Derivation used when a new salt is generated (configure and
    /// change-password).  Existing envelopes are always read with the
    /// scheme recorded in them.
    kdf: KdfParams,

    state: VaultState,

    /// Public index read from the envelope; available while locked.
    saved_ids: BTreeSet<String>,

    status_tx: watch::Sender<VaultStatus>,
}

impl CredentialVault {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Load the vault backed by `file`.
    ///
    /// The vault starts `Locked` if an envelope exists and `Unconfigured`
    /// otherwise.  A malformed envelope is reported as `DecodeFailure`.
    pub fn open(file: VaultFileStore, kdf: KdfParams) -> Result<Self> {
        let envelope = file.read()?;

        let (state, saved_ids) = match &envelope {
            Some(env) => (VaultState::Locked, index_of(env)),
            None => (VaultState::Unconfigured, BTreeSet::new()),
        };

        let status = VaultStatus {
            lifecycle: lifecycle_of(&state),
            saved_count: saved_ids.len(),
        };
        let (status_tx, _) = watch::channel(status);

        debug!(path = %file.path().display(), ?status, "vault opened");

        Ok(Self {
            file,
            kdf,
            state,
            saved_ids,
            status_tx,
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create the vault with a new master password.
    ///
    /// Generates a salt, derives the key, writes an empty envelope and
    /// leaves the vault unlocked.
    pub fn configure(&mut self, password: &str, confirm: &str) -> Result<()> {
        if self.is_configured() || self.file.exists() {
            return Err(OpenTermError::AlreadyConfigured(self.file.path().to_path_buf()));
        }
        check_new_password(password, confirm)?;

        let salt = generate_salt();
        let key = VaultKey::new(self.kdf.derive(password.as_bytes(), &salt)?);
        let entries = VaultPayload::new();

        let envelope = envelope::encrypt(&entries, &key, &salt, &self.kdf)?;
        self.file.write(&envelope)?;

        self.saved_ids = index_of(&envelope);
        self.state = VaultState::Unlocked(UnlockedVault {
            key,
            salt: salt.to_vec(),
            kdf: self.kdf,
            entries,
        });
        info!(path = %self.file.path().display(), "vault configured");
        self.publish();
        Ok(())
    }

    /// Unlock with the master password.
    ///
    /// On a wrong password the vault stays in its previous state and the
    /// file is not touched.
    pub fn unlock(&mut self, password: &str) -> Result<()> {
        let envelope = self.read_envelope()?;

        let (key, entries) = match open_envelope(&envelope, password) {
            Ok(parts) => parts,
            Err(e) => {
                warn!("vault unlock failed: {e}");
                return Err(e);
            }
        };

        // Older envelopes carry no id index; the decrypted entries are authoritative.
        self.saved_ids = entries.passwords.keys().cloned().collect();
        self.state = VaultState::Unlocked(UnlockedVault {
            key,
            salt: envelope.salt.clone(),
            kdf: envelope.kdf_params(),
            entries,
        });
        info!(saved = self.saved_ids.len(), "vault unlocked");
        self.publish();
        Ok(())
    }

    /// Drop the key and every plaintext entry from memory.
    pub fn lock(&mut self) {
        if let VaultState::Unlocked(_) = self.state {
            // Dropping the old state zeroizes key and entries.
            self.state = VaultState::Locked;
            info!("vault locked");
            self.publish();
        }
    }

    // ------------------------------------------------------------------
    // Entry operations (require Unlocked)
    // ------------------------------------------------------------------

    /// Add or replace the password for a connection.
    pub fn store_password(&mut self, connection_id: &str, password: &str) -> Result<()> {
        validate_connection_id(connection_id)?;
        let mut next = self.unlocked()?.entries.clone();
        next.passwords
            .insert(connection_id.to_string(), password.to_string());
        self.commit_entries(next)?;
        debug!(connection_id, "password stored");
        Ok(())
    }

    /// Remove the password for a connection.
    ///
    /// Returns whether an entry existed.  The envelope is rewritten either
    /// way.
    pub fn remove_password(&mut self, connection_id: &str) -> Result<bool> {
        let mut next = self.unlocked()?.entries.clone();
        let existed = next.passwords.remove(connection_id).is_some();
        self.commit_entries(next)?;
        debug!(connection_id, existed, "password removed");
        Ok(existed)
    }

    /// Remove every stored password.
    pub fn remove_all(&mut self) -> Result<()> {
        self.unlocked()?;
        self.commit_entries(VaultPayload::new())?;
        info!("all saved passwords removed");
        Ok(())
    }

    /// Look up the saved password for a connection.
    pub fn password(&self, connection_id: &str) -> Result<Option<&str>> {
        Ok(self
            .unlocked()?
            .entries
            .passwords
            .get(connection_id)
            .map(String::as_str))
    }

    // ------------------------------------------------------------------
    // Re-keying
    // ------------------------------------------------------------------

    /// Re-encrypt the vault under a new master password and a new salt.
    ///
    /// Works from both Locked and Unlocked; ends Unlocked.  The current
    /// password is verified against the envelope on disk.  Any failure
    /// leaves the vault unchanged.
    pub fn change_master_password(
        &mut self,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<()> {
        check_new_password(new_password, confirm)?;

        let envelope = self.read_envelope()?;
        let (_old_key, entries) = open_envelope(&envelope, current)?;

        let salt = generate_salt();
        let key = VaultKey::new(self.kdf.derive(new_password.as_bytes(), &salt)?);
        let new_envelope = envelope::encrypt(&entries, &key, &salt, &self.kdf)?;
        self.file.write(&new_envelope)?;

        self.saved_ids = index_of(&new_envelope);
        self.state = VaultState::Unlocked(UnlockedVault {
            key,
            salt: salt.to_vec(),
            kdf: self.kdf,
            entries,
        });
        info!("master password changed");
        self.publish();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Export / import
    // ------------------------------------------------------------------

    /// Decrypt the envelope with `master_password` and return its contents.
    ///
    /// The runtime lock state is not touched.  Any failure yields `None`.
    pub fn export_passwords(&self, master_password: &str) -> Option<PasswordExport> {
        let envelope = match self.file.read() {
            Ok(Some(envelope)) => envelope,
            Ok(None) => {
                warn!("export requested but the vault is not configured");
                return None;
            }
            Err(e) => {
                warn!("export failed to read the vault: {e}");
                return None;
            }
        };

        match open_envelope(&envelope, master_password) {
            Ok((_key, payload)) => {
                info!(count = payload.len(), "passwords exported");
                Some(payload)
            }
            Err(e) => {
                warn!("export failed: {e}");
                None
            }
        }
    }

    /// Merge `export` into the vault, imported values winning on collision.
    ///
    /// - Unconfigured: the vault is configured with `master_password` and
    ///   stays unlocked.
    /// - Locked: the vault is unlocked for the merge and locked again
    ///   afterwards, whether or not the merge succeeded.
    /// - Unlocked: `master_password` must decrypt the envelope on disk.
    ///
    /// Returns the number of imported entries.
    pub fn import_passwords(
        &mut self,
        export: &PasswordExport,
        master_password: &str,
    ) -> Result<usize> {
        for id in export.passwords.keys() {
            validate_connection_id(id)?;
        }

        let relock = match self.lifecycle() {
            VaultLifecycle::Unconfigured => {
                self.configure(master_password, master_password)?;
                false
            }
            VaultLifecycle::Locked => {
                self.unlock(master_password)?;
                true
            }
            VaultLifecycle::Unlocked => {
                let envelope = self.read_envelope()?;
                open_envelope(&envelope, master_password)?;
                false
            }
        };

        let result = self.unlocked().map(|u| u.entries.clone()).and_then(|mut next| {
            let count = next.merge_from(export);
            self.commit_entries(next).map(|()| count)
        });

        if relock {
            self.lock();
        }

        if let Ok(count) = result {
            info!(count, "passwords imported");
        }
        result
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the vault file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns `true` if an envelope exists (independent of lock state).
    pub fn is_configured(&self) -> bool {
        !matches!(self.state, VaultState::Unconfigured)
    }

    /// Returns `true` while the key is held in memory.
    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, VaultState::Unlocked(_))
    }

    pub fn lifecycle(&self) -> VaultLifecycle {
        lifecycle_of(&self.state)
    }

    /// Connection ids with a saved password.
    ///
    /// Read from the envelope's public index, so this works while locked.
    pub fn saved_connection_ids(&self) -> &BTreeSet<String> {
        &self.saved_ids
    }

    /// Current status snapshot.
    pub fn status(&self) -> VaultStatus {
        VaultStatus {
            lifecycle: self.lifecycle(),
            saved_count: self.saved_ids.len(),
        }
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<VaultStatus> {
        self.status_tx.subscribe()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn unlocked(&self) -> Result<&UnlockedVault> {
        match &self.state {
            VaultState::Unlocked(unlocked) => Ok(unlocked),
            VaultState::Locked => Err(OpenTermError::VaultLocked),
            VaultState::Unconfigured => Err(OpenTermError::NotConfigured),
        }
    }

    /// Read the envelope from disk, syncing the state if it vanished.
    fn read_envelope(&mut self) -> Result<VaultEnvelope> {
        match self.file.read()? {
            Some(envelope) => Ok(envelope),
            None => {
                if self.is_configured() {
                    warn!(path = %self.file.path().display(), "vault file disappeared");
                    self.state = VaultState::Unconfigured;
                    self.saved_ids.clear();
                    self.publish();
                }
                Err(OpenTermError::NotConfigured)
            }
        }
    }

    /// Encrypt `next`, write it, then make it the in-memory entries.
    fn commit_entries(&mut self, next: VaultPayload) -> Result<()> {
        let VaultState::Unlocked(unlocked) = &mut self.state else {
            return Err(OpenTermError::VaultLocked);
        };

        let envelope = envelope::encrypt(&next, &unlocked.key, &unlocked.salt, &unlocked.kdf)?;
        self.file.write(&envelope)?;

        unlocked.entries = next;
        self.saved_ids = index_of(&envelope);
        self.publish();
        Ok(())
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.status());
    }
}

fn lifecycle_of(state: &VaultState) -> VaultLifecycle {
    match state {
        VaultState::Unconfigured => VaultLifecycle::Unconfigured,
        VaultState::Locked => VaultLifecycle::Locked,
        VaultState::Unlocked(_) => VaultLifecycle::Unlocked,
    }
}

fn index_of(envelope: &VaultEnvelope) -> BTreeSet<String> {
    envelope.connection_ids().iter().cloned().collect()
}

/// Derive the envelope's key from `password` and decrypt it.
fn open_envelope(envelope: &VaultEnvelope, password: &str) -> Result<(VaultKey, VaultPayload)> {
    let key = VaultKey::new(
        envelope
            .kdf_params()
            .derive(password.as_bytes(), &envelope.salt)?,
    );
    let payload = envelope::decrypt(envelope, &key)?;
    Ok((key, payload))
}

/// A new password must be non-empty and match its confirmation.
fn check_new_password(password: &str, confirm: &str) -> Result<()> {
    if password.is_empty() {
        return Err(OpenTermError::EmptyPassword);
    }
    // Constant-time comparison; lengths leak, contents do not.
    if !bool::from(password.as_bytes().ct_eq(confirm.as_bytes())) {
        return Err(OpenTermError::PasswordMismatch);
    }
    Ok(())
}

/// Connection ids are the string form of a UUID.
fn validate_connection_id(id: &str) -> Result<()> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| OpenTermError::InvalidConnectionId(id.to_string()))
}
