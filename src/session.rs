//! Login/registration orchestration.
//!
//! `VaultSession` walks the state machine
//! `Unauthenticated → MasterVerified → Authenticated → Closed`: the
//! master password is checked first, then the configured second factor,
//! and only an `Authenticated` session may touch the owner's entries.
//! A failed second factor leaves the session at `MasterVerified`, so
//! the factor can be retried without re-entering the password.

use chrono::Utc;
use data_encoding::HEXLOWER;
use rand::RngCore;
use tracing::info;
use zeroize::Zeroize;

use crate::crypto::kdf::{generate_salt, Argon2Params};
use crate::crypto::{hash_password, verify_password, SecretCipher};
use crate::errors::{PassVaultError, Result};
use crate::store::{CredentialEntry, EntryMetadata, MasterCredential, PlainEntry, User, VaultStore};
use crate::twofactor::{
    backup_code_digest, generate_backup_codes, provision_totp, SecondFactor, SecondFactorStrategy,
    TotpProvisioning,
};

/// Issuer label baked into `otpauth://` enrolment URLs.
const TOTP_ISSUER: &str = "PassVault";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    /// Master password verified; awaiting the second factor.
    MasterVerified,
    Authenticated,
    Closed,
}

/// Material handed to the user exactly once, at registration.
pub struct Registration {
    pub totp: TotpProvisioning,
    /// Plaintext single-use backup codes; only digests are persisted.
    pub backup_codes: Vec<String>,
}

/// An entry after the decrypt step.
#[derive(Debug)]
pub struct DecryptedEntry {
    pub service: String,
    pub username: String,
    pub secret: String,
}

pub struct VaultSession<'a> {
    store: &'a VaultStore,
    strategy: SecondFactorStrategy,
    kdf_params: Argon2Params,
    state: SessionState,
    user: Option<User>,
    cipher: Option<SecretCipher>,
    factor: Option<Box<dyn SecondFactor>>,
}

impl<'a> VaultSession<'a> {
    pub fn new(store: &'a VaultStore, strategy: SecondFactorStrategy) -> Self {
        Self::with_kdf_params(store, strategy, Argon2Params::default())
    }

    /// Use explicit KDF cost parameters for new registrations (loaded
    /// from `passvault.toml`); logins always use the parameters stored
    /// with the user record.
    pub fn with_kdf_params(
        store: &'a VaultStore,
        strategy: SecondFactorStrategy,
        kdf_params: Argon2Params,
    ) -> Self {
        Self {
            store,
            strategy,
            kdf_params,
            state: SessionState::Unauthenticated,
            user: None,
            cipher: None,
            factor: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Provision a new identity: hash the master password, generate the
    /// TOTP secret, backup codes and cipher salt, and persist the user
    /// together with the vault's master credential.
    pub fn register(&mut self, email: &str, password: &str) -> Result<Registration> {
        if self.state == SessionState::Closed {
            return Err(PassVaultError::NotAuthenticated);
        }
        if self.store.find_user(email)?.is_some() {
            return Err(PassVaultError::AlreadyExists(email.to_string()));
        }

        let totp = provision_totp(TOTP_ISSUER, email);
        let backup_codes = generate_backup_codes();
        let password_hash = hash_password(password)?;

        let user = User {
            id: new_user_id(),
            email: email.to_string(),
            password_hash: password_hash.clone(),
            totp_secret: Some(totp.secret.clone()),
            backup_codes: backup_codes.iter().map(|c| backup_code_digest(c)).collect(),
            cipher_salt: generate_salt().to_vec(),
            kdf_params: self.kdf_params,
        };

        self.store.upsert_user(&user)?;
        self.store
            .save_master_credential(&MasterCredential {
                hash: password_hash,
            })?;

        info!(email, "registered new vault owner");
        Ok(Registration { totp, backup_codes })
    }

    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    /// Verify the master password.  On success the session moves to
    /// `MasterVerified` and the entry cipher is derived; the second
    /// factor still has to pass before any entry operation is allowed.
    pub fn login(&mut self, email: &str, password: &str) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(PassVaultError::NotAuthenticated);
        }
        self.abandon();

        let user = self
            .store
            .find_user(email)?
            .ok_or_else(|| PassVaultError::NotFound(email.to_string()))?;

        if !verify_password(password, &user.password_hash) {
            return Err(PassVaultError::InvalidCredential);
        }

        let cipher = SecretCipher::derive(password, &user.cipher_salt, &user.kdf_params)?;
        self.factor = Some(self.strategy.build(&user)?);
        self.user = Some(user);
        self.cipher = Some(cipher);
        self.state = SessionState::MasterVerified;
        Ok(())
    }

    /// Start a fresh second-factor cycle (dispatches a code for the
    /// email strategy).  Returns `false` when the factor could not be
    /// prepared; the session stays at `MasterVerified`.
    pub fn begin_second_factor(&mut self) -> Result<bool> {
        if self.state != SessionState::MasterVerified {
            return Err(PassVaultError::NotAuthenticated);
        }
        let Some(factor) = self.factor.as_mut() else {
            return Err(PassVaultError::NotAuthenticated);
        };
        Ok(factor.begin())
    }

    /// Check one submitted code (or backup code).  Success moves the
    /// session to `Authenticated`; failure leaves it at
    /// `MasterVerified` so the caller may retry or abandon.
    pub fn verify_second_factor(&mut self, code: &str) -> Result<bool> {
        if self.state != SessionState::MasterVerified {
            return Err(PassVaultError::NotAuthenticated);
        }
        let mut accepted = match self.factor.as_mut() {
            Some(factor) => factor.verify(code),
            None => return Err(PassVaultError::NotAuthenticated),
        };
        if !accepted {
            accepted = self.consume_backup_code(code)?;
        }
        if accepted {
            self.state = SessionState::Authenticated;
        }
        Ok(accepted)
    }

    /// Accept a single-use backup code in place of the factor code.
    fn consume_backup_code(&mut self, code: &str) -> Result<bool> {
        let digest = backup_code_digest(code);
        let Some(user) = self.user.as_mut() else {
            return Ok(false);
        };
        let Some(pos) = user.backup_codes.iter().position(|d| *d == digest) else {
            return Ok(false);
        };

        user.backup_codes.remove(pos);
        self.store.upsert_user(user)?;
        info!(email = %user.email, remaining = user.backup_codes.len(), "backup code consumed");
        Ok(true)
    }

    /// Drop back to `Unauthenticated`, discarding key material.
    pub fn abandon(&mut self) {
        if self.state != SessionState::Closed {
            self.state = SessionState::Unauthenticated;
            self.user = None;
            self.cipher = None;
            self.factor = None;
        }
    }

    /// Terminal: a closed session accepts no further operations.
    pub fn logout(&mut self) {
        self.user = None;
        self.cipher = None;
        self.factor = None;
        self.state = SessionState::Closed;
    }

    fn authenticated(&self) -> Result<(&User, &SecretCipher)> {
        if self.state != SessionState::Authenticated {
            return Err(PassVaultError::NotAuthenticated);
        }
        match (&self.user, &self.cipher) {
            (Some(user), Some(cipher)) => Ok((user, cipher)),
            _ => Err(PassVaultError::NotAuthenticated),
        }
    }

    // ------------------------------------------------------------------
    // Entry operations (Authenticated only)
    // ------------------------------------------------------------------

    /// Add or update the entry for `service` (upsert by
    /// `(service, owner)`; `created_at` is preserved across updates).
    pub fn add_entry(&self, service: &str, username: &str, secret: &str) -> Result<()> {
        let (user, cipher) = self.authenticated()?;

        let now = Utc::now();
        let created_at = self
            .store
            .find_entry(service, &user.id)?
            .map_or(now, |existing| existing.created_at);

        self.store.upsert_entry(&CredentialEntry {
            service: service.to_string(),
            username: username.to_string(),
            secret: cipher.encrypt(service, secret)?,
            user_id: user.id.clone(),
            created_at,
            updated_at: now,
        })
    }

    /// Fetch and decrypt the entry for `service`.
    pub fn get_entry(&self, service: &str) -> Result<DecryptedEntry> {
        let (user, cipher) = self.authenticated()?;

        let entry = self
            .store
            .find_entry(service, &user.id)?
            .ok_or_else(|| PassVaultError::NotFound(service.to_string()))?;

        Ok(DecryptedEntry {
            secret: cipher.decrypt(service, &entry.secret)?,
            service: entry.service,
            username: entry.username,
        })
    }

    /// List the owner's entries without touching any ciphertext.
    pub fn list_entries(&self) -> Result<Vec<EntryMetadata>> {
        let (user, _) = self.authenticated()?;
        let entries = self.store.list_entries(&user.id)?;
        Ok(entries.iter().map(EntryMetadata::from).collect())
    }

    /// Replace the owner's whole entry set with `entries`, encrypting
    /// each before persistence.  Inherits the non-atomicity of the
    /// store-level bulk replace.
    pub fn replace_entries(&self, entries: &[PlainEntry]) -> Result<()> {
        let (user, cipher) = self.authenticated()?;

        let now = Utc::now();
        let mut encrypted = Vec::with_capacity(entries.len());
        for entry in entries {
            encrypted.push(CredentialEntry {
                service: entry.service.clone(),
                username: entry.username.clone(),
                secret: cipher.encrypt(&entry.service, &entry.password)?,
                user_id: user.id.clone(),
                created_at: now,
                updated_at: now,
            });
        }

        self.store.replace_all_for_owner(&user.id, &encrypted)
    }

    /// Change the master password: re-hash, re-derive the cipher salt
    /// and key, and re-encrypt every entry under the new key.
    pub fn change_master_password(&mut self, current: &str, new: &str) -> Result<()> {
        let (user, cipher) = self.authenticated()?;

        if !verify_password(current, &user.password_hash) {
            return Err(PassVaultError::InvalidCredential);
        }

        // Decrypt everything while the old key is still at hand.
        let mut plain = Vec::new();
        for entry in self.store.list_entries(&user.id)? {
            plain.push(PlainEntry {
                password: cipher.decrypt(&entry.service, &entry.secret)?,
                service: entry.service,
                username: entry.username,
            });
        }

        let new_hash = hash_password(new)?;
        let new_salt = generate_salt().to_vec();
        let new_cipher = SecretCipher::derive(new, &new_salt, &self.kdf_params)?;

        let mut updated = user.clone();
        updated.password_hash = new_hash.clone();
        updated.cipher_salt = new_salt;
        updated.kdf_params = self.kdf_params;

        // Re-encrypt first, then swap the credential records.  A crash
        // in between is the documented partial-replace risk.
        let now = Utc::now();
        let mut encrypted = Vec::with_capacity(plain.len());
        for entry in &plain {
            encrypted.push(CredentialEntry {
                service: entry.service.clone(),
                username: entry.username.clone(),
                secret: new_cipher.encrypt(&entry.service, &entry.password)?,
                user_id: updated.id.clone(),
                created_at: now,
                updated_at: now,
            });
        }
        self.store.replace_all_for_owner(&updated.id, &encrypted)?;
        self.store.upsert_user(&updated)?;
        self.store
            .save_master_credential(&MasterCredential { hash: new_hash })?;

        // Wipe the recovered plaintexts before they go out of scope.
        for entry in &mut plain {
            entry.password.zeroize();
        }

        self.user = Some(updated);
        self.cipher = Some(new_cipher);
        info!("master password changed; entries re-encrypted");
        Ok(())
    }
}

/// Random 96-bit identifier, hex encoded.
fn new_user_id() -> String {
    let mut raw = [0u8; 12];
    rand::rng().fill_bytes(&mut raw);
    HEXLOWER.encode(&raw)
}
