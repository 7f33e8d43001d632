// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use keyward_config::StorageConfig;
use keyward_core::KeywardError;
use tracing::debug;

/// Handle to the custody database.
///
/// Cheap to clone; all clones share the single background connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run
    /// migrations. WAL mode is enabled.
    pub async fn open(path: &str) -> Result<Self, KeywardError> {
        Self::open_with_config(&StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        })
        .await
    }

    /// Open the database described by `config`.
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self, KeywardError> {
        let conn = tokio_rusqlite::Connection::open(&config.database_path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        let wal = config.wal_mode;
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(|e| KeywardError::Storage {
                source: Box::new(e),
            })?;

        debug!(path = %config.database_path, "custody database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying connection handle.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and release the connection.
    pub async fn close(&self) -> Result<(), KeywardError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Convert tokio-rusqlite errors to KeywardError::Storage.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> KeywardError {
    KeywardError::Storage {
        source: Box::new(e),
    }
}
