//! SQLite storage backend.
//!
//! Both tiers are SQLite databases: the local file under the vault
//! directory, and optionally a remote/cloud target (typically a path on
//! a mounted sync drive).  Opening runs the schema migration and a
//! liveness probe, so a backend that constructs successfully is usable.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::crypto::kdf::Argon2Params;
use crate::errors::{PassVaultError, Result};

use super::backend::StorageBackend;
use super::model::{CredentialEntry, MasterCredential, User};

impl From<rusqlite::Error> for PassVaultError {
    fn from(e: rusqlite::Error) -> Self {
        Self::OperationFailed(e.to_string())
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY,
    email           TEXT NOT NULL UNIQUE,
    password_hash   TEXT NOT NULL,
    totp_secret     TEXT,
    backup_codes    TEXT NOT NULL DEFAULT '[]',
    cipher_salt     TEXT NOT NULL,
    kdf_memory_kib  INTEGER NOT NULL,
    kdf_iterations  INTEGER NOT NULL,
    kdf_parallelism INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS entries (
    service    TEXT NOT NULL,
    username   TEXT NOT NULL,
    secret     TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (service, user_id)
);
CREATE TABLE IF NOT EXISTS master_credential (
    hash TEXT NOT NULL
);
";

/// One SQLite endpoint.
pub struct SqliteBackend {
    conn: Connection,
    name: String,
}

impl SqliteBackend {
    /// Open (or create) the database at `target`, migrate the schema,
    /// and probe it.  Fails if the containing directory is missing —
    /// backend resolution relies on that to detect an unreachable tier.
    pub fn open(target: &str, name: &str) -> Result<Self> {
        let conn = Connection::open(target)
            .map_err(|e| PassVaultError::OperationFailed(format!("open {target}: {e}")))?;
        conn.execute_batch(SCHEMA)?;

        let backend = Self {
            conn,
            name: name.to_string(),
        };
        backend.ping()?;
        Ok(backend)
    }
}

impl StorageBackend for SqliteBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn ping(&self) -> Result<()> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn load_master_credential(&self) -> Result<Option<MasterCredential>> {
        let hash = self
            .conn
            .query_row("SELECT hash FROM master_credential LIMIT 1", [], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(hash.map(|hash| MasterCredential { hash }))
    }

    fn save_master_credential(&self, credential: &MasterCredential) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM master_credential", [])?;
        tx.execute(
            "INSERT INTO master_credential (hash) VALUES (?1)",
            params![credential.hash],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn find_user(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, password_hash, totp_secret, backup_codes, cipher_salt,
                        kdf_memory_kib, kdf_iterations, kdf_parallelism
                 FROM users WHERE email = ?1",
                params![email],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn upsert_user(&self, user: &User) -> Result<()> {
        let backup_codes = serde_json::to_string(&user.backup_codes)
            .map_err(|e| PassVaultError::SerializationError(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO users (id, email, password_hash, totp_secret, backup_codes,
                                cipher_salt, kdf_memory_kib, kdf_iterations, kdf_parallelism)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(email) DO UPDATE SET
                 id = excluded.id,
                 password_hash = excluded.password_hash,
                 totp_secret = excluded.totp_secret,
                 backup_codes = excluded.backup_codes,
                 cipher_salt = excluded.cipher_salt,
                 kdf_memory_kib = excluded.kdf_memory_kib,
                 kdf_iterations = excluded.kdf_iterations,
                 kdf_parallelism = excluded.kdf_parallelism",
            params![
                user.id,
                user.email,
                user.password_hash,
                user.totp_secret,
                backup_codes,
                BASE64.encode(&user.cipher_salt),
                user.kdf_params.memory_kib,
                user.kdf_params.iterations,
                user.kdf_params.parallelism,
            ],
        )?;
        Ok(())
    }

    fn upsert_entry(&self, entry: &CredentialEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO entries (service, username, secret, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(service, user_id) DO UPDATE SET
                 username = excluded.username,
                 secret = excluded.secret,
                 updated_at = excluded.updated_at",
            params![
                entry.service,
                entry.username,
                entry.secret,
                entry.user_id,
                entry.created_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn find_entry(&self, service: &str, owner: &str) -> Result<Option<CredentialEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT service, username, secret, user_id, created_at, updated_at
                 FROM entries WHERE service = ?1 AND user_id = ?2",
                params![service, owner],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn list_entries(&self, owner: &str) -> Result<Vec<CredentialEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT service, username, secret, user_id, created_at, updated_at
             FROM entries WHERE user_id = ?1 ORDER BY service",
        )?;
        let rows = stmt.query_map(params![owner], row_to_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn delete_entries_for_owner(&self, owner: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM entries WHERE user_id = ?1", params![owner])?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.conn
            .close()
            .map_err(|(_, e)| PassVaultError::OperationFailed(format!("close: {e}")))
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let backup_json: String = row.get(4)?;
    let salt_b64: String = row.get(5)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        totp_secret: row.get(3)?,
        backup_codes: serde_json::from_str(&backup_json).unwrap_or_default(),
        cipher_salt: BASE64.decode(&salt_b64).unwrap_or_default(),
        kdf_params: Argon2Params {
            memory_kib: row.get(6)?,
            iterations: row.get(7)?,
            parallelism: row.get(8)?,
        },
    })
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<CredentialEntry> {
    let created: String = row.get(4)?;
    let updated: String = row.get(5)?;
    Ok(CredentialEntry {
        service: row.get(0)?,
        username: row.get(1)?,
        secret: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_timestamp(&created),
        updated_at: parse_timestamp(&updated),
    })
}

/// Timestamps are RFC 3339 text columns; an unparseable value falls
/// back to "now" rather than poisoning the whole row.
fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
