// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master-password custody and brute-force rate limiting for the Keyward
//! password vault.
//!
//! Two tightly coupled components: a persisted [`RateLimiter`] implementing
//! exponential backoff with a cooldown-based reset, and a
//! [`MasterPasswordManager`] implementing creation, verification, rotation,
//! and credential-bundle import of the vault-protecting key material. The
//! manager records a limiter failure on every failed verification; callers
//! consult [`RateLimiter::status`] before attempting one.

pub mod crypto;
pub mod kdf;
pub mod master;
pub mod rate_limit;
pub mod records;

pub use master::{CredentialBundle, MasterPasswordManager, VaultSession};
pub use rate_limit::{RateLimitState, RateLimitStatus, RateLimiter, MAX_ATTEMPTS};
pub use records::{KdfParams, MasterEncryptionRecord, MasterPasswordRecord};
