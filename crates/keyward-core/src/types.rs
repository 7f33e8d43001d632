// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared between the stores and the custody core.

use zeroize::Zeroizing;

/// Length in bytes of the symmetric key protecting a vault.
pub const VAULT_KEY_LEN: usize = 32;

/// The symmetric key protecting the contents of a vault.
///
/// Exists only transiently in memory; never persisted in cleartext. The
/// backing bytes are zeroed on drop, and Debug output omits them.
#[derive(Clone)]
pub struct VaultKey(Zeroizing<[u8; VAULT_KEY_LEN]>);

impl VaultKey {
    pub fn new(bytes: [u8; VAULT_KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Build a key from a decrypted buffer. Returns `None` unless the buffer
    /// is exactly [`VAULT_KEY_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; VAULT_KEY_LEN] = bytes.try_into().ok()?;
        Some(Self(Zeroizing::new(arr)))
    }

    pub fn as_bytes(&self) -> &[u8; VAULT_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("VaultKey").field(&"[REDACTED]").finish()
    }
}
