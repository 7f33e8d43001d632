// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent-store traits for the custody core.
//!
//! The custody crate only ever talks to these traits; the SQLite
//! implementations live in keyward-storage. Binding a store handle means
//! constructing a component with a trait object, so presence of the `get`
//! and `add` operations is checked at compile time rather than per call.

use async_trait::async_trait;

use crate::error::KeywardError;
use crate::types::VaultKey;

/// Keyed store for rate-limiter attempt state. Values are JSON rows.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Fetch the row for `key`, or `None` if it was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, KeywardError>;

    /// Insert or replace the row for `key`.
    async fn add(&self, key: &str, value: &str) -> Result<(), KeywardError>;
}

/// The durable keyed record store behind an open vault.
///
/// `init_master` hands over the vault key; the store is the long-lived
/// holder of that key for the life of the process session. Record
/// operations fail with a storage error while the vault is not open.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Open the vault with the recovered key and its verification hash.
    async fn init_master(
        &self,
        encryption_key: VaultKey,
        hashed_password: &[u8],
    ) -> Result<(), KeywardError>;

    /// Whether this process session already holds an open vault.
    fn is_initialized(&self) -> bool;

    /// Insert or replace a named record.
    async fn add(&self, name: &str, record: &[u8]) -> Result<(), KeywardError>;

    /// Fetch a named record, or `None` if absent.
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, KeywardError>;

    /// List record names in lexical order.
    async fn list(&self) -> Result<Vec<String>, KeywardError>;

    /// Close the session, dropping the held key.
    async fn close(&self) -> Result<(), KeywardError>;
}

/// The keyed record store reachable before the vault is opened.
///
/// Holds the hashless master-password projection so a credential can be
/// validated without materializing the whole vault.
#[async_trait]
pub trait EncryptionStore: Send + Sync {
    async fn init(&self) -> Result<(), KeywardError>;

    fn is_initialized(&self) -> bool;

    async fn add(&self, name: &str, record: &[u8]) -> Result<(), KeywardError>;

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, KeywardError>;

    async fn close(&self) -> Result<(), KeywardError>;
}

/// Secondary per-profile vault session.
///
/// Consulted during master-password rotation; a richer re-keying
/// propagation can hang off this trait without touching the manager.
#[async_trait]
pub trait ActiveVaultStore: Send + Sync {
    async fn init(&self, encryption_key: VaultKey) -> Result<(), KeywardError>;

    fn is_initialized(&self) -> bool;

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, KeywardError>;

    async fn close(&self) -> Result<(), KeywardError>;
}
