//! AES-256-GCM entry encryption.
//!
//! `SecretCipher` owns the master key for the lifetime of a login
//! session and is the only component allowed to interpret entry
//! ciphertext.  Each call to `encrypt` generates a fresh random 12-byte
//! nonce and prepends it to the ciphertext; the whole blob is base64
//! encoded for storage:
//!
//!   base64( [ 12-byte nonce | ciphertext + 16-byte auth tag ] )

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroize;

use crate::errors::{PassVaultError, Result};

use super::kdf::{derive_master_key, Argon2Params};
use super::keys::MasterKey;

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Symmetric cipher for stored secret fields.
///
/// Create one with [`SecretCipher::derive`] after the master password
/// has been verified.  Decrypting a record written under a different
/// master password fails with `DecryptionFailed`.
pub struct SecretCipher {
    master: MasterKey,
}

impl SecretCipher {
    /// Derive the cipher key from the master password and the per-user
    /// salt stored in the user record.
    pub fn derive(password: &str, salt: &[u8], params: &Argon2Params) -> Result<Self> {
        let mut key_bytes = derive_master_key(password.as_bytes(), salt, params)?;
        let master = MasterKey::new(key_bytes);
        key_bytes.zeroize();
        Ok(Self { master })
    }

    /// Build a cipher directly from a master key (tests, key rotation).
    pub fn from_key(master: MasterKey) -> Self {
        Self { master }
    }

    /// Encrypt a plaintext secret for the given service.
    ///
    /// Returns a base64 string suitable for a storage column.
    pub fn encrypt(&self, service: &str, plaintext: &str) -> Result<String> {
        let mut entry_key = self.master.derive_entry_key(service)?;
        let sealed = seal(&entry_key, plaintext.as_bytes());
        entry_key.zeroize();
        Ok(BASE64.encode(sealed?))
    }

    /// Decrypt a base64 ciphertext produced by [`SecretCipher::encrypt`].
    ///
    /// Any parse or authentication failure maps to `DecryptionFailed`
    /// without further detail.
    pub fn decrypt(&self, service: &str, encoded: &str) -> Result<String> {
        let blob = BASE64
            .decode(encoded)
            .map_err(|_| PassVaultError::DecryptionFailed)?;

        let mut entry_key = self.master.derive_entry_key(service)?;
        let plaintext = open(&entry_key, &blob);
        entry_key.zeroize();

        String::from_utf8(plaintext?).map_err(|_| PassVaultError::DecryptionFailed)
    }
}

/// Encrypt `plaintext` with a 32-byte `key`, returning nonce || ciphertext.
fn seal(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| PassVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| PassVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    // Prepend the nonce so the caller only needs to store one blob.
    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt data that was produced by `seal`.
fn open(key: &[u8], blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < NONCE_LEN {
        return Err(PassVaultError::DecryptionFailed);
    }

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| PassVaultError::DecryptionFailed)?;

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| PassVaultError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> SecretCipher {
        SecretCipher::from_key(MasterKey::new([0x42; 32]))
    }

    #[test]
    fn ciphertext_is_bound_to_the_service_name() {
        let cipher = test_cipher();
        let encoded = cipher.encrypt("github", "hunter2").unwrap();

        // Same key, different service: the per-entry key differs.
        assert!(matches!(
            cipher.decrypt("gitlab", &encoded),
            Err(PassVaultError::DecryptionFailed)
        ));
        assert_eq!(cipher.decrypt("github", &encoded).unwrap(), "hunter2");
    }

    #[test]
    fn rejects_garbage_base64() {
        let cipher = test_cipher();
        assert!(matches!(
            cipher.decrypt("github", "not//valid//base64!!"),
            Err(PassVaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn rejects_truncated_blob() {
        let cipher = test_cipher();
        // Shorter than a nonce.
        let short = BASE64.encode([0u8; 5]);
        assert!(matches!(
            cipher.decrypt("github", &short),
            Err(PassVaultError::DecryptionFailed)
        ));
    }
}
