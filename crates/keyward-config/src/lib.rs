// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Keyward password vault.
//!
//! TOML files merged over compiled defaults via Figment, with `KEYWARD_*`
//! environment variable overrides.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{KdfConfig, KeywardConfig, StorageConfig};
