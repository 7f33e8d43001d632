// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id key derivation from a master password.
//!
//! Derives a 32-byte verification hash using Argon2id (Algorithm::Argon2id,
//! Version::V0x13). Creation paths take their cost parameters from
//! [`KdfConfig`]; verification paths take the parameters recorded beside the
//! salt, so material created under older settings still verifies.

use keyward_config::KdfConfig;
use keyward_core::KeywardError;
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::records::KdfParams;

/// Length in bytes of the random per-creation salt.
pub const SALT_LEN: usize = 16;

/// Length in bytes of the derived verification hash.
pub const HASH_LEN: usize = 32;

/// Hash a master password under a fresh random salt.
///
/// Returns `(hashed_password, salt)`; the hash doubles as the vault-key
/// wrapping key.
pub fn hash_password(
    password: &SecretString,
    config: &KdfConfig,
) -> Result<(Zeroizing<[u8; HASH_LEN]>, [u8; SALT_LEN]), KeywardError> {
    let salt = generate_salt()?;
    let hashed = derive_key(
        password.expose_secret().as_bytes(),
        &salt,
        config.memory_cost,
        config.iterations,
        config.parallelism,
    )?;
    Ok((hashed, salt))
}

/// Re-derive the verification hash for an existing salt.
///
/// Deterministic given `(salt, password)` and the recorded parameters.
pub fn derive_decryption_key(
    password: &SecretString,
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; HASH_LEN]>, KeywardError> {
    derive_key(
        password.expose_secret().as_bytes(),
        salt,
        params.memory_cost,
        params.iterations,
        params.parallelism,
    )
}

/// Derive a 32-byte key from a passphrase using Argon2id.
///
/// The returned key is wrapped in [`Zeroizing`] for automatic memory zeroing
/// on drop.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8; SALT_LEN],
    memory_cost: u32,
    iterations: u32,
    parallelism: u32,
) -> Result<Zeroizing<[u8; HASH_LEN]>, KeywardError> {
    let params = argon2::Params::new(memory_cost, iterations, parallelism, Some(HASH_LEN))
        .map_err(|e| KeywardError::Vault(format!("invalid Argon2id parameters: {e}")))?;

    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; HASH_LEN]);
    argon2
        .hash_password_into(passphrase, salt, output.as_mut())
        .map_err(|e| KeywardError::Vault(format!("Argon2id key derivation failed: {e}")))?;

    Ok(output)
}

/// Generate a random 16-byte salt for Argon2id.
pub fn generate_salt() -> Result<[u8; SALT_LEN], KeywardError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| KeywardError::Vault("failed to generate random salt".to_string()))?;
    Ok(salt)
}
