//! Second-factor verification.
//!
//! Two interchangeable strategies implement [`SecondFactor`]: a local
//! time-based one-time code check (`totp`) and a generated code
//! delivered out-of-band and compared on input (`email`).  Which one a
//! session uses is a configuration-time choice via
//! [`SecondFactorStrategy`].

pub mod email;
pub mod totp;

use std::sync::Arc;

use data_encoding::HEXLOWER;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::errors::{PassVaultError, Result};
use crate::store::model::User;

pub use email::{CodeDelivery, EmailCodeFactor};
pub use totp::{provision_totp, TotpFactor, TotpProvisioning};

/// A single second-factor verification cycle.
///
/// `begin` starts a fresh attempt (for the email variant it issues and
/// dispatches a new code; for TOTP it is a no-op).  `verify` checks one
/// submitted code.  Neither method panics or errors: delivery failures
/// and malformed input are plain rejections.
pub trait SecondFactor {
    /// Prepare a fresh attempt.  Returns `false` if the factor could
    /// not be prepared (e.g. code delivery failed), in which case the
    /// following `verify` call will reject.
    fn begin(&mut self) -> bool;

    /// Check a submitted code.  Delivered codes are single-use: they
    /// are discarded after the comparison regardless of outcome.
    fn verify(&mut self, submitted: &str) -> bool;
}

/// Configuration-time choice of second-factor strategy.
#[derive(Clone)]
pub enum SecondFactorStrategy {
    /// Authenticator-app codes against the secret persisted at
    /// registration.
    Totp,
    /// A fresh 6-digit code dispatched through an external delivery
    /// collaborator on every attempt.
    EmailCode(Arc<dyn CodeDelivery>),
}

impl SecondFactorStrategy {
    /// Build a factor instance for one login of `user`.
    pub fn build(&self, user: &User) -> Result<Box<dyn SecondFactor>> {
        match self {
            Self::Totp => {
                let secret = user.totp_secret.as_deref().ok_or_else(|| {
                    PassVaultError::ConfigError(format!(
                        "account '{}' has no TOTP secret provisioned",
                        user.email
                    ))
                })?;
                Ok(Box::new(TotpFactor::new(secret)))
            }
            Self::EmailCode(delivery) => Ok(Box::new(EmailCodeFactor::new(
                user.email.clone(),
                Arc::clone(delivery),
            ))),
        }
    }
}

/// Number of single-use backup codes issued at registration.
const BACKUP_CODE_COUNT: usize = 8;

/// Alphabet for backup codes; ambiguous characters (0/O, 1/I) excluded.
const BACKUP_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate the plaintext backup codes handed to the user once at
/// registration, formatted `XXXX-XXXX`.
pub fn generate_backup_codes() -> Vec<String> {
    let mut rng = rand::rng();
    (0..BACKUP_CODE_COUNT)
        .map(|_| format!("{}-{}", code_chunk(&mut rng), code_chunk(&mut rng)))
        .collect()
}

fn code_chunk<R: Rng>(rng: &mut R) -> String {
    (0..4)
        .map(|_| char::from(BACKUP_ALPHABET[rng.random_range(0..BACKUP_ALPHABET.len())]))
        .collect()
}

/// SHA-256 digest of a backup code, hex encoded.  Only digests are
/// persisted in the user record.
pub fn backup_code_digest(code: &str) -> String {
    let normalized: String = code
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    HEXLOWER.encode(&Sha256::digest(normalized.as_bytes()))
}
