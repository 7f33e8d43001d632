// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the encryption record store.
//!
//! Independently openable before the vault: it holds the hashless
//! master-password projection so a typed credential can be validated (or a
//! vault key recovered) without materializing the vault itself.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use keyward_core::{EncryptionStore, KeywardError};
use rusqlite::params;
use tracing::debug;

use crate::database::{map_tr_err, Database};

/// SQLite-backed encryption record store.
#[derive(Debug)]
pub struct SqliteEncryptionStore {
    db: Database,
    initialized: AtomicBool,
}

impl SqliteEncryptionStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            initialized: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), KeywardError> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(KeywardError::Storage {
                source: "encryption store not open -- call init first".into(),
            })
        }
    }
}

#[async_trait]
impl EncryptionStore for SqliteEncryptionStore {
    async fn init(&self) -> Result<(), KeywardError> {
        // Touch the table so a broken database surfaces here, not mid-operation.
        self.db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM encryption_records", [], |row| {
                    row.get(0)
                })
            })
            .await
            .map_err(map_tr_err)?;
        self.initialized.store(true, Ordering::Release);
        debug!("encryption store opened");
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
                    "INSERT OR REPLACE INTO encryption_records (name, record) VALUES (?1, ?2)",
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
                    "SELECT record FROM encryption_records WHERE name = ?1",
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
        self.initialized.store(false, Ordering::Release);
        debug!("encryption store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open_store() -> (SqliteEncryptionStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("encryption.db").to_str().unwrap())
            .await
            .unwrap();
        (SqliteEncryptionStore::new(db), dir)
    }

    #[tokio::test]
    async fn operations_require_init() {
        let (store, _dir) = open_store().await;
        assert!(!store.is_initialized());
        assert!(store.add("rec", b"x").await.is_err());
        assert!(store.get("rec").await.is_err());
    }

    #[tokio::test]
    async fn add_get_roundtrip_survives_close() {
        let (store, _dir) = open_store().await;
        store.init().await.unwrap();
        store.add("master_password", b"{\"c\":\"zz\"}").await.unwrap();

        store.close().await.unwrap();
        assert!(!store.is_initialized());

        store.init().await.unwrap();
        assert_eq!(
            store.get("master_password").await.unwrap().as_deref(),
            Some(&b"{\"c\":\"zz\"}"[..])
        );
    }
}
