//! Key derivation helpers using HKDF-SHA256.
//!
//! From a single master key we derive a unique **per-entry** encryption
//! key for each service name, so compromising one encrypted value does
//! not reveal the others.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::errors::{PassVaultError, Result};

/// Length of derived sub-keys (256 bits).
const KEY_LEN: usize = 32;

/// Derive a per-entry encryption key from the master key.
///
/// `info` is set to `"passvault:entry:<service>"` to bind the derived
/// key to a specific service entry.
pub fn derive_entry_key(master_key: &[u8], service: &str) -> Result<[u8; KEY_LEN]> {
    let info = format!("passvault:entry:{service}");
    hkdf_derive(master_key, info.as_bytes())
}

/// Internal helper: run HKDF-SHA256 expand with the given `info`.
///
/// The extract step is skipped and the master key used directly as the
/// pseudo-random key, because the master key already has high entropy
/// (it came from Argon2id).
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| PassVaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A wrapper around a 32-byte master key that automatically zeroes
/// its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a new `MasterKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Derive a per-entry encryption key from this master key.
    pub fn derive_entry_key(&self, service: &str) -> Result<[u8; KEY_LEN]> {
        derive_entry_key(&self.bytes, service)
    }
}
