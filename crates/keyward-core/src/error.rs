// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Keyward key-custody core.
//!
//! Every failure path carries a fixed message so callers can branch on
//! failure category without string parsing beyond a stable prefix.

use thiserror::Error;

/// The primary error type used across the Keyward stores and custody operations.
#[derive(Debug, Error)]
pub enum KeywardError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Vault-level errors: corrupted records, missing records, primitive failures.
    #[error("vault error: {0}")]
    Vault(String),

    /// A credential bundle was submitted with one or more absent fields.
    #[error("missing required parameters")]
    MissingParameters,

    /// The derived hash does not match the stored verification hash.
    #[error("provided credentials do not match existing master encryption")]
    CredentialMismatch,

    /// The current password supplied for a rotation is wrong.
    #[error("invalid password")]
    InvalidPassword,

    /// Unwrapping the vault key failed: wrong hash, tampered or corrupted ciphertext.
    #[error("error decrypting vault key")]
    VaultKeyDecrypt,

    /// The attempt store could not be read; the attempt is denied.
    #[error("rate limiter unavailable")]
    RateLimiterUnavailable,

    /// The attempt store could not be written; the attempt is denied.
    #[error("failed to record attempt -- denying access")]
    RecordAttemptFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_messages_are_stable() {
        // Callers grep these exact strings; changing them is a breaking change.
        assert_eq!(
            KeywardError::MissingParameters.to_string(),
            "missing required parameters"
        );
        assert_eq!(
            KeywardError::CredentialMismatch.to_string(),
            "provided credentials do not match existing master encryption"
        );
        assert_eq!(KeywardError::InvalidPassword.to_string(), "invalid password");
        assert_eq!(
            KeywardError::VaultKeyDecrypt.to_string(),
            "error decrypting vault key"
        );
        assert_eq!(
            KeywardError::RateLimiterUnavailable.to_string(),
            "rate limiter unavailable"
        );
        assert_eq!(
            KeywardError::RecordAttemptFailed.to_string(),
            "failed to record attempt -- denying access"
        );
    }

    #[test]
    fn storage_variant_carries_source() {
        let err = KeywardError::Storage {
            source: Box::new(std::io::Error::other("disk gone")),
        };
        assert!(err.to_string().contains("disk gone"));
    }
}
