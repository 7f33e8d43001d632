// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the rate-limiter attempt store.
//!
//! No session gating: failed-attempt bookkeeping must work before any vault
//! or encryption session is open.

use async_trait::async_trait;
use keyward_core::{AttemptStore, KeywardError};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

/// SQLite-backed attempt-counter store.
#[derive(Debug)]
pub struct SqliteAttemptStore {
    db: Database,
}

impl SqliteAttemptStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AttemptStore for SqliteAttemptStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KeywardError> {
        let key = key.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                let result = conn.query_row(
                    "SELECT value FROM attempt_counters WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                );
                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)
    }

    async fn add(&self, key: &str, value: &str) -> Result<(), KeywardError> {
        let key = key.to_string();
        let value = value.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO attempt_counters (key, value) VALUES (?1, ?2)",
                    params![key, value],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(())
    }
}
