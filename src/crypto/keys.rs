//! In-memory holder for the derived vault key.

use zeroize::Zeroize;

use super::kdf::KEY_LEN;

/// A wrapper around the 32-byte vault key that automatically zeroes
/// its memory when dropped.
///
/// The key only exists while the vault is unlocked; locking the vault
/// drops it.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct VaultKey {
    bytes: [u8; KEY_LEN],
}

impl VaultKey {
    /// Take ownership of raw key bytes, wiping the caller's copy.
    pub fn new(mut bytes: [u8; KEY_LEN]) -> Self {
        let key = Self { bytes };
        bytes.zeroize();
        key
    }

    /// Access the raw key bytes (e.g. to pass to the cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey(..)")
    }
}
