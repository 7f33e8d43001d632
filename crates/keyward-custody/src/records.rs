// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted projections of the master-password record.
//!
//! The same `(ciphertext, nonce, salt)` triple is written to two stores on
//! every create/rotate: the vault store keeps the verification hash beside
//! it, the encryption store never sees the hash. The hashless projection is
//! derived from the full record at write time only; the two schemas are
//! never reconstructed from one another at read time.

use keyward_config::KdfConfig;
use keyward_core::KeywardError;
use serde::{Deserialize, Serialize};

/// Vault-store key of the full master record.
pub const MASTER_ENCRYPTION_RECORD: &str = "master_encryption";

/// Encryption-store key of the hashless master record.
pub const MASTER_PASSWORD_RECORD: &str = "master_password";

/// Argon2id parameters recorded beside the salt at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl From<&KdfConfig> for KdfParams {
    fn from(config: &KdfConfig) -> Self {
        Self {
            memory_cost: config.memory_cost,
            iterations: config.iterations,
            parallelism: config.parallelism,
        }
    }
}

/// Vault-store projection: the wrapped vault key plus verification hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterEncryptionRecord {
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub nonce: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    pub kdf: KdfParams,
    #[serde(with = "base64_bytes")]
    pub hashed_password: Vec<u8>,
}

impl MasterEncryptionRecord {
    /// Derive the hashless projection written to the encryption store.
    pub fn password_projection(&self) -> MasterPasswordRecord {
        MasterPasswordRecord {
            ciphertext: self.ciphertext.clone(),
            nonce: self.nonce.clone(),
            salt: self.salt.clone(),
            kdf: self.kdf.clone(),
        }
    }

    pub fn salt_array(&self) -> Result<[u8; crate::kdf::SALT_LEN], KeywardError> {
        fixed_bytes(&self.salt, "salt")
    }
}

impl std::fmt::Debug for MasterEncryptionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterEncryptionRecord")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("nonce_len", &self.nonce.len())
            .field("salt_len", &self.salt.len())
            .field("kdf", &self.kdf)
            .field("hashed_password", &"[REDACTED]")
            .finish()
    }
}

/// Encryption-store projection: same triple, without the verification hash.
///
/// Reachable before the vault is opened, so it must not leak the hash
/// outside the vault boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterPasswordRecord {
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub nonce: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    pub kdf: KdfParams,
}

impl MasterPasswordRecord {
    pub fn salt_array(&self) -> Result<[u8; crate::kdf::SALT_LEN], KeywardError> {
        fixed_bytes(&self.salt, "salt")
    }
}

/// Coerce a stored byte field to its fixed length, or fail as corrupted.
pub(crate) fn fixed_bytes<const N: usize>(
    bytes: &[u8],
    what: &str,
) -> Result<[u8; N], KeywardError> {
    bytes
        .try_into()
        .map_err(|_| KeywardError::Vault(format!("corrupted {what} (expected {N} bytes)")))
}

/// Serialize binary record fields as base64 strings so the stored JSON stays
/// inspectable.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> MasterEncryptionRecord {
        MasterEncryptionRecord {
            ciphertext: vec![1, 2, 3, 4],
            nonce: vec![5; 12],
            salt: vec![6; 16],
            kdf: KdfParams {
                memory_cost: 19456,
                iterations: 2,
                parallelism: 1,
            },
            hashed_password: vec![7; 32],
        }
    }

    #[test]
    fn password_projection_shares_triple_and_drops_hash() {
        let record = sample_record();
        let projection = record.password_projection();

        assert_eq!(projection.ciphertext, record.ciphertext);
        assert_eq!(projection.nonce, record.nonce);
        assert_eq!(projection.salt, record.salt);
        assert_eq!(projection.kdf, record.kdf);

        let json = serde_json::to_string(&projection).unwrap();
        assert!(!json.contains("hashed_password"));
    }

    #[test]
    fn records_roundtrip_through_json() {
        let record = sample_record();
        let json = serde_json::to_vec(&record).unwrap();
        let parsed: MasterEncryptionRecord = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed, record);

        let projection = record.password_projection();
        let json = serde_json::to_vec(&projection).unwrap();
        let parsed: MasterPasswordRecord = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed, projection);
    }

    #[test]
    fn binary_fields_serialize_as_base64_strings() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        // base64 of [1,2,3,4], not a JSON number array.
        assert!(json.contains("\"AQIDBA==\""));
        assert!(!json.contains("[1,2,3,4]"));
    }

    #[test]
    fn wrong_salt_length_is_reported_as_corrupted() {
        let mut record = sample_record();
        record.salt = vec![6; 15];

        let err = record.salt_array().unwrap_err();
        assert!(err.to_string().contains("corrupted salt"));
    }

    #[test]
    fn debug_output_redacts_the_hash() {
        let rendered = format!("{:?}", sample_record());
        assert!(rendered.contains("REDACTED"));
    }
}
