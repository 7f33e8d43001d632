// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the secondary per-profile vault session.
//!
//! Reads the same vault_records table as the primary store but holds its own
//! session key, so a profile view can be opened and closed independently.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use keyward_core::{ActiveVaultStore, KeywardError, VaultKey};
use rusqlite::params;
use tokio::sync::RwLock;
use tracing::debug;

use crate::database::{map_tr_err, Database};

/// SQLite-backed active-profile vault session.
pub struct SqliteActiveVaultStore {
    db: Database,
    session_key: RwLock<Option<VaultKey>>,
    initialized: AtomicBool,
}

impl SqliteActiveVaultStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            session_key: RwLock::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), KeywardError> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(KeywardError::Storage {
                source: "active vault session not open -- call init first".into(),
            })
        }
    }
}

impl std::fmt::Debug for SqliteActiveVaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteActiveVaultStore")
            .field("initialized", &self.initialized.load(Ordering::Acquire))
            .finish()
    }
}

#[async_trait]
impl ActiveVaultStore for SqliteActiveVaultStore {
    async fn init(&self, encryption_key: VaultKey) -> Result<(), KeywardError> {
        let mut guard = self.session_key.write().await;
        *guard = Some(encryption_key);
        self.initialized.store(true, Ordering::Release);
        debug!("active vault session opened");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, KeywardError> {
        self.ensure_open()?;
        let name = name.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<Vec<u8>>, rusqlite::Error> {
                let result = conn.query_row(
                    "SELECT record FROM vault_records WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                );
                match result {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)
    }

    async fn close(&self) -> Result<(), KeywardError> {
        let mut guard = self.session_key.write().await;
        guard.take(); // Zeroizing clears the key bytes on drop
        self.initialized.store(false, Ordering::Release);
        debug!("active vault session closed");
        Ok(())
    }
}
