//! Plaintext vault contents.
//!
//! A `VaultPayload` only ever exists in memory while the vault is
//! unlocked (or transiently during export/import).  Its JSON shape,
//! `{ "passwords": { "<connection-id>": "<password>" } }`, is both what
//! gets encrypted into the envelope and the password export format.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Map of connection id (string form of a UUID) to plaintext password.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultPayload {
    #[serde(default)]
    pub passwords: HashMap<String, String>,
}

/// Password export/import object: same shape as the encrypted payload.
pub type PasswordExport = VaultPayload;

impl VaultPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored passwords.
    pub fn len(&self) -> usize {
        self.passwords.len()
    }

    /// Returns `true` if no passwords are stored.
    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }

    /// Connection ids, sorted for a stable public index.
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.passwords.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Merge `other` into `self`; on a key collision the incoming value wins.
    ///
    /// Returns the number of entries taken from `other`.
    pub fn merge_from(&mut self, other: &VaultPayload) -> usize {
        for (id, password) in &other.passwords {
            if let Some(mut previous) = self.passwords.insert(id.clone(), password.clone()) {
                previous.zeroize();
            }
        }
        other.passwords.len()
    }
}

impl FromIterator<(String, String)> for VaultPayload {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            passwords: iter.into_iter().collect(),
        }
    }
}

impl Drop for VaultPayload {
    fn drop(&mut self) {
        for value in self.passwords.values_mut() {
            value.zeroize();
        }
    }
}

// Never print plaintext passwords, even in debug output.
impl std::fmt::Debug for VaultPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultPayload")
            .field("connection_ids", &self.sorted_ids())
            .finish()
    }
}
