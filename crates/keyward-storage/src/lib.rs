// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Keyward password vault.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and store
//! implementations of the keyward-core collaborator traits.

pub mod database;
pub mod migrations;
pub mod stores;

pub use database::Database;
pub use stores::{
    SqliteActiveVaultStore, SqliteAttemptStore, SqliteEncryptionStore, SqliteVaultStore,
};
