// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Keyward password vault.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Keyward workspace. The custody core and
//! the storage backends both depend on it and on nothing else of each other.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::KeywardError;
pub use traits::{ActiveVaultStore, AttemptStore, EncryptionStore, VaultStore};
pub use types::{VaultKey, VAULT_KEY_LEN};
