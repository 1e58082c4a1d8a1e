//! Persisted record types.
//!
//! `CredentialEntry::secret` is ciphertext produced by `SecretCipher`
//! and is opaque to the storage layer; only the crypto module may
//! interpret it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::kdf::Argon2Params;

/// The single master-credential record.  At most one exists per store;
/// saving replaces any prior record.
#[derive(Debug, Clone)]
pub struct MasterCredential {
    pub hash: String,
}

/// A registered vault owner.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    /// Argon2id PHC hash of the master password.
    pub password_hash: String,
    /// Base32 TOTP shared secret, provisioned at registration.
    pub totp_secret: Option<String>,
    /// SHA-256 hex digests of the remaining single-use backup codes.
    pub backup_codes: Vec<String>,
    /// Per-user salt for deriving the entry-encryption key.
    pub cipher_salt: Vec<u8>,
    /// KDF cost parameters in force when the salt was generated.
    pub kdf_params: Argon2Params,
}

/// One stored service credential, keyed by `(service, user_id)`.
#[derive(Debug, Clone)]
pub struct CredentialEntry {
    pub service: String,
    pub username: String,
    /// Base64 ciphertext (nonce || AES-GCM output), opaque here.
    pub secret: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lightweight listing row: no ciphertext leaves the store for `list`.
#[derive(Debug, Clone)]
pub struct EntryMetadata {
    pub service: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&CredentialEntry> for EntryMetadata {
    fn from(entry: &CredentialEntry) -> Self {
        Self {
            service: entry.service.clone(),
            username: entry.username.clone(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

/// Plaintext entry shape used by bulk import; encrypted before it ever
/// reaches a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlainEntry {
    pub service: String,
    pub username: String,
    pub password: String,
}
