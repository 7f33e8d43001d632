// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM vault-key wrapping and constant-time hash comparison.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the
//! system CSPRNG. Nonce reuse would be catastrophic for GCM security.
//!
//! [`decrypt_vault_key`] never returns an error: any failure to unwrap --
//! wrong hash, tampered ciphertext, malformed lengths -- is an
//! authentication failure and yields `None`.

use keyward_core::{KeywardError, VaultKey, VAULT_KEY_LEN};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use crate::kdf::HASH_LEN;

/// Length in bytes of the AES-GCM nonce.
pub const NONCE_LEN: usize = 12;

/// Generate a fresh random vault key.
pub fn generate_vault_key() -> Result<VaultKey, KeywardError> {
    let rng = SystemRandom::new();
    let mut key = [0u8; VAULT_KEY_LEN];
    rng.fill(&mut key)
        .map_err(|_| KeywardError::Vault("failed to generate random vault key".to_string()))?;
    Ok(VaultKey::new(key))
}

/// Generate a fresh vault key and wrap it under the hashed password.
///
/// Returns `(ciphertext_with_tag, nonce)`. The plaintext key is not
/// returned; callers recover it via [`decrypt_vault_key`].
pub fn encrypt_vault_key_with_hashed_password(
    hashed_password: &[u8; HASH_LEN],
) -> Result<(Vec<u8>, [u8; NONCE_LEN]), KeywardError> {
    let vault_key = generate_vault_key()?;
    seal(hashed_password, vault_key.as_bytes())
}

/// Wrap an existing vault key under a new hashed password.
///
/// Used on rotation: the key itself never changes, only its wrapping.
pub fn encrypt_vault_with_key(
    hashed_password: &[u8; HASH_LEN],
    vault_key: &VaultKey,
) -> Result<(Vec<u8>, [u8; NONCE_LEN]), KeywardError> {
    seal(hashed_password, vault_key.as_bytes())
}

/// Unwrap a vault key with the given hashed password.
///
/// Returns `None` on any failure; this function never errors.
pub fn decrypt_vault_key(ciphertext: &[u8], nonce: &[u8], hashed_password: &[u8]) -> Option<VaultKey> {
    let key: [u8; HASH_LEN] = hashed_password.try_into().ok()?;
    let nonce: [u8; NONCE_LEN] = nonce.try_into().ok()?;
    let plaintext = open(&key, &nonce, ciphertext).ok()?;
    VaultKey::from_slice(&plaintext)
}

/// Compare two hashes in constant time.
///
/// Execution time is independent of where the first differing byte occurs.
/// Differing lengths compare unequal (lengths are public here).
pub fn constant_time_hash_compare(a: &[u8], b: &[u8]) -> bool {
    ring::constant_time::verify_slices_are_equal(a, b).is_ok()
}

/// Encrypt plaintext with AES-256-GCM using a random 96-bit nonce.
///
/// Returns `(ciphertext_with_tag, nonce_bytes)`. The caller must store both
/// to be able to decrypt later.
pub fn seal(
    key: &[u8; HASH_LEN],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; NONCE_LEN]), KeywardError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| KeywardError::Vault("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| KeywardError::Vault("failed to generate random nonce".to_string()))?;

    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    // Seal in place: plaintext buffer is extended with the authentication tag.
    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| KeywardError::Vault("AES-256-GCM encryption failed".to_string()))?;

    Ok((in_out, nonce_bytes))
}

/// Decrypt ciphertext with AES-256-GCM.
///
/// `ciphertext` must include the 16-byte authentication tag appended by
/// [`seal`].
pub fn open(
    key: &[u8; HASH_LEN],
    nonce_bytes: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, KeywardError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| KeywardError::Vault("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let nonce = Nonce::assume_unique_for_key(*nonce_bytes);

    let mut in_out = ciphertext.to_vec();
    let plaintext = less_safe
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| {
            KeywardError::Vault(
                "AES-256-GCM decryption failed -- wrong key or corrupted data".to_string(),
            )
        })?;

    Ok(plaintext.to_vec())
}
