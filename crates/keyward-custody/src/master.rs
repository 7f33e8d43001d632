// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master-password lifecycle: create, verify, rotate, and credential-bundle
//! import of the vault-protecting key material.
//!
//! The manager uses a key-wrapping pattern: a random vault key protects the
//! vault, and the key itself is wrapped under the Argon2id hash of the
//! master password. Rotation only re-wraps the key; the key never changes.
//!
//! Callers are expected to consult [`RateLimiter::status`] before attempting
//! verification; the manager's own obligation is to record exactly one
//! failure per failed password entry.

use std::sync::Arc;

use keyward_config::KdfConfig;
use keyward_core::{
    ActiveVaultStore, EncryptionStore, KeywardError, VaultStore,
};
use secrecy::SecretString;
use tracing::{debug, info};

use crate::crypto;
use crate::kdf;
use crate::rate_limit::RateLimiter;
use crate::records::{
    KdfParams, MasterEncryptionRecord, MasterPasswordRecord, MASTER_ENCRYPTION_RECORD,
    MASTER_PASSWORD_RECORD,
};

/// The stores belonging to one vault session.
///
/// Explicit rather than ambient: several sessions can coexist in a process,
/// each with its own store handles.
pub struct VaultSession {
    vaults: Arc<dyn VaultStore>,
    encryption: Arc<dyn EncryptionStore>,
    active_vault: Option<Arc<dyn ActiveVaultStore>>,
}

impl VaultSession {
    pub fn new(vaults: Arc<dyn VaultStore>, encryption: Arc<dyn EncryptionStore>) -> Self {
        Self {
            vaults,
            encryption,
            active_vault: None,
        }
    }

    /// Attach a secondary per-profile vault session.
    pub fn with_active_vault(mut self, active_vault: Arc<dyn ActiveVaultStore>) -> Self {
        self.active_vault = Some(active_vault);
        self
    }
}

impl std::fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSession")
            .field("vault_open", &self.vaults.is_initialized())
            .field("encryption_open", &self.encryption.is_initialized())
            .field("has_active_vault", &self.active_vault.is_some())
            .finish()
    }
}

/// An out-of-band-delivered wrapped vault key.
///
/// Shaped like the transport payload: every field optional, presence
/// validated before any cryptographic work.
#[derive(Clone, Default)]
pub struct CredentialBundle {
    pub ciphertext: Option<Vec<u8>>,
    pub nonce: Option<Vec<u8>>,
    pub hashed_password: Option<Vec<u8>>,
}

impl CredentialBundle {
    fn require_fields(&self) -> Result<(&[u8], &[u8], &[u8]), KeywardError> {
        match (&self.ciphertext, &self.nonce, &self.hashed_password) {
            (Some(ciphertext), Some(nonce), Some(hashed)) => {
                Ok((ciphertext, nonce, hashed))
            }
            _ => Err(KeywardError::MissingParameters),
        }
    }
}

impl std::fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("ciphertext", &self.ciphertext.as_ref().map(|c| c.len()))
            .field("nonce", &self.nonce.as_ref().map(|n| n.len()))
            .field(
                "hashed_password",
                &self.hashed_password.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Orchestrates password hashing, vault-key wrapping, and persistence of the
/// two master-record projections.
#[derive(Debug)]
pub struct MasterPasswordManager {
    session: VaultSession,
    rate_limiter: RateLimiter,
    kdf: KdfConfig,
}

impl MasterPasswordManager {
    pub fn new(session: VaultSession, rate_limiter: RateLimiter, kdf: KdfConfig) -> Self {
        Self {
            session,
            rate_limiter,
            kdf,
        }
    }

    /// The limiter guarding this credential, for caller-side status checks.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Create the master password and the vault it protects.
    ///
    /// Does not re-check for an existing record; guarding against accidental
    /// overwrite is the caller's responsibility.
    pub async fn create_master_password(
        &self,
        password: &SecretString,
    ) -> Result<MasterEncryptionRecord, KeywardError> {
        if !self.session.encryption.is_initialized() {
            self.session.encryption.init().await?;
        }

        let (hashed, salt) = kdf::hash_password(password, &self.kdf)?;
        let (ciphertext, nonce) = crypto::encrypt_vault_key_with_hashed_password(&hashed)?;

        // Recover the freshly wrapped key to hand the vault store its copy.
        let vault_key = crypto::decrypt_vault_key(&ciphertext, &nonce, &*hashed)
            .ok_or(KeywardError::VaultKeyDecrypt)?;
        self.session.vaults.init_master(vault_key, &*hashed).await?;

        let record = MasterEncryptionRecord {
            ciphertext,
            nonce: nonce.to_vec(),
            salt: salt.to_vec(),
            kdf: KdfParams::from(&self.kdf),
            hashed_password: hashed.to_vec(),
        };
        self.persist_projections(&record).await?;

        info!("master password created");
        Ok(record)
    }

    /// Verify the master password, opening the vault if it is not open yet.
    ///
    /// Two mutually exclusive paths:
    /// - vault already open: constant-time compare against the stored hash;
    ///   no vault-key decryption is attempted.
    /// - vault not open: derive, unwrap the stored ciphertext, and hand the
    ///   recovered key to the vault store.
    ///
    /// Every failed verification records exactly one limiter failure.
    pub async fn init_with_password(&self, password: &SecretString) -> Result<(), KeywardError> {
        if self.session.vaults.is_initialized() {
            let record = self.master_encryption_record().await?;
            let salt = record.salt_array()?;
            let derived = kdf::derive_decryption_key(password, &salt, &record.kdf)?;

            if !crypto::constant_time_hash_compare(&*derived, &record.hashed_password) {
                self.rate_limiter.record_failure().await?;
                return Err(KeywardError::CredentialMismatch);
            }

            debug!("credentials verified against open vault");
            return Ok(());
        }

        if !self.session.encryption.is_initialized() {
            self.session.encryption.init().await?;
        }
        let record = self.master_password_record().await?;
        let salt = record.salt_array()?;
        let derived = kdf::derive_decryption_key(password, &salt, &record.kdf)?;

        match crypto::decrypt_vault_key(&record.ciphertext, &record.nonce, &*derived) {
            None => {
                self.rate_limiter.record_failure().await?;
                Err(KeywardError::VaultKeyDecrypt)
            }
            Some(vault_key) => {
                self.session.vaults.init_master(vault_key, &*derived).await?;
                info!("vault unlocked with master password");
                Ok(())
            }
        }
    }

    /// Rotate the master password, re-wrapping the unchanged vault key.
    ///
    /// A wrong current password fails with "invalid password" and touches no
    /// state at all. From the caller's point of view the rotation is atomic:
    /// both projections are rewritten before this returns.
    pub async fn update_master_password(
        &self,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<MasterEncryptionRecord, KeywardError> {
        let record = self.master_encryption_record().await?;
        let salt = record.salt_array()?;
        let derived = kdf::derive_decryption_key(current_password, &salt, &record.kdf)?;

        if !crypto::constant_time_hash_compare(&*derived, &record.hashed_password) {
            return Err(KeywardError::InvalidPassword);
        }

        let vault_key = crypto::decrypt_vault_key(&record.ciphertext, &record.nonce, &*derived)
            .ok_or(KeywardError::VaultKeyDecrypt)?;

        let (new_hashed, new_salt) = kdf::hash_password(new_password, &self.kdf)?;
        let (ciphertext, nonce) = crypto::encrypt_vault_with_key(&new_hashed, &vault_key)?;

        let new_record = MasterEncryptionRecord {
            ciphertext,
            nonce: nonce.to_vec(),
            salt: new_salt.to_vec(),
            kdf: KdfParams::from(&self.kdf),
            hashed_password: new_hashed.to_vec(),
        };
        self.persist_projections(&new_record).await?;

        if let Some(active) = &self.session.active_vault
            && active.is_initialized()
        {
            // The vault key is unchanged; an open profile session stays valid
            // and observes the rotation through the canonical projections.
            debug!("active profile session open during rotation");
        }

        info!("master password rotated");
        Ok(new_record)
    }

    /// Open the vault from an out-of-band credential bundle.
    ///
    /// Not a password-guessing surface: the hash arrives ready-made, so the
    /// rate limiter is not consulted. Transports exposing this operation
    /// should apply their own limiter.
    pub async fn init_with_credentials(
        &self,
        bundle: &CredentialBundle,
    ) -> Result<(), KeywardError> {
        let (ciphertext, nonce, hashed_password) = bundle.require_fields()?;

        if !self.session.encryption.is_initialized() {
            self.session.encryption.init().await?;
        }

        match crypto::decrypt_vault_key(ciphertext, nonce, hashed_password) {
            None => Err(KeywardError::VaultKeyDecrypt),
            Some(vault_key) => {
                self.session
                    .vaults
                    .init_master(vault_key, hashed_password)
                    .await?;
                info!("vault unlocked with credential bundle");
                Ok(())
            }
        }
    }

    /// Write both projections, vault store first. They always encode the
    /// same `(ciphertext, nonce, salt)` triple and are never written
    /// independently.
    async fn persist_projections(
        &self,
        record: &MasterEncryptionRecord,
    ) -> Result<(), KeywardError> {
        let vault_bytes = serde_json::to_vec(record).map_err(|e| {
            KeywardError::Vault(format!("failed to encode master encryption record: {e}"))
        })?;
        let password_bytes = serde_json::to_vec(&record.password_projection()).map_err(|e| {
            KeywardError::Vault(format!("failed to encode master password record: {e}"))
        })?;

        self.session
            .vaults
            .add(MASTER_ENCRYPTION_RECORD, &vault_bytes)
            .await?;
        self.session
            .encryption
            .add(MASTER_PASSWORD_RECORD, &password_bytes)
            .await?;
        Ok(())
    }

    async fn master_encryption_record(&self) -> Result<MasterEncryptionRecord, KeywardError> {
        let bytes = self
            .session
            .vaults
            .get(MASTER_ENCRYPTION_RECORD)
            .await?
            .ok_or_else(|| KeywardError::Vault("no master encryption record found".to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            KeywardError::Vault(format!("corrupted master encryption record: {e}"))
        })
    }

    async fn master_password_record(&self) -> Result<MasterPasswordRecord, KeywardError> {
        let bytes = self
            .session
            .encryption
            .get(MASTER_PASSWORD_RECORD)
            .await?
            .ok_or_else(|| KeywardError::Vault("no master password record found".to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            KeywardError::Vault(format!("corrupted master password record: {e}"))
        })
    }
}
