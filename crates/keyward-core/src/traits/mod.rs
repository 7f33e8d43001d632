// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the custody core.

mod store;

pub use store::{ActiveVaultStore, AttemptStore, EncryptionStore, VaultStore};
