// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the primary vault record store.
//!
//! The store is the long-lived holder of the vault key: `init_master` hands
//! the recovered key over, and every record operation is gated on that
//! session being open. Records are opaque bytes; record-level encryption is
//! the storage engine's concern, not this keyed store's.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use keyward_core::{KeywardError, VaultKey, VaultStore};
use rusqlite::params;
use tokio::sync::RwLock;
use tracing::debug;
use zeroize::Zeroize;

use crate::database::{map_tr_err, Database};

/// In-memory state of an open vault session.
struct OpenSession {
    master_key: VaultKey,
    verification_hash: Vec<u8>,
}

/// SQLite-backed vault record store.
pub struct SqliteVaultStore {
    db: Database,
    session: RwLock<Option<OpenSession>>,
    initialized: AtomicBool,
}

impl SqliteVaultStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            session: RwLock::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), KeywardError> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(KeywardError::Storage {
                source: "vault not open -- call init_master first".into(),
            })
        }
    }
}

impl std::fmt::Debug for SqliteVaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVaultStore")
            .field("initialized", &self.initialized.load(Ordering::Acquire))
            .finish()
    }
}

#[async_trait]
impl VaultStore for SqliteVaultStore {
    async fn init_master(
        &self,
        encryption_key: VaultKey,
        hashed_password: &[u8],
    ) -> Result<(), KeywardError> {
        let mut guard = self.session.write().await;
        *guard = Some(OpenSession {
            master_key: encryption_key,
            verification_hash: hashed_password.to_vec(),
        });
        self.initialized.store(true, Ordering::Release);
        debug!("vault session opened");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    async fn add(&self, name: &str, record: &[u8]) -> Result<(), KeywardError> {
        self.ensure_open()?;
        let name = name.to_string();
        let record = record.to_vec();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO vault_records (name, record) VALUES (?1, ?2)",
                    params![name, record],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(())
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

    async fn list(&self) -> Result<Vec<String>, KeywardError> {
        self.ensure_open()?;
        self.db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT name FROM vault_records ORDER BY name")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                let mut names = Vec::new();
                for row in rows {
                    names.push(row?);
                }
                Ok(names)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn close(&self) -> Result<(), KeywardError> {
        let mut guard = self.session.write().await;
        if let Some(mut session) = guard.take() {
            session.verification_hash.zeroize();
            drop(session.master_key); // Zeroizing clears the key bytes
        }
        self.initialized.store(false, Ordering::Release);
        debug!("vault session closed");
        Ok(())
    }
}
