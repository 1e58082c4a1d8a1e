//! RFC 6238 time-based one-time codes over HMAC-SHA-1.
//!
//! Codes are 6 digits on a 30-second period.  Verification accepts the
//! current window plus one window either side, the standard clock-skew
//! tolerance.  Outside that tolerance a mismatch is a normal rejection,
//! not an error.

use std::time::{SystemTime, UNIX_EPOCH};

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

use super::SecondFactor;

type HmacSha1 = Hmac<Sha1>;

/// Code length in digits.
const DIGITS: u32 = 6;

/// Time step in seconds.
const PERIOD: u64 = 30;

/// Accepted clock skew, in periods, either side of now.
const SKEW: u64 = 1;

/// TOTP secret length in bytes (160 bits, per RFC 4226).
const SECRET_LEN: usize = 20;

/// Provisioning material returned at registration: the shared secret
/// and an `otpauth://` URL for authenticator apps.
#[derive(Debug, Clone)]
pub struct TotpProvisioning {
    /// Base32-encoded shared secret, persisted in the user record.
    pub secret: String,
    /// URL to render as a QR code in an authenticator app.
    pub otpauth_url: String,
}

/// Generate a fresh TOTP secret and its enrolment URL.
pub fn provision_totp(issuer: &str, account: &str) -> TotpProvisioning {
    use rand::RngCore;

    let mut raw = [0u8; SECRET_LEN];
    rand::rng().fill_bytes(&mut raw);
    let secret = BASE32_NOPAD.encode(&raw);

    let otpauth_url = format!(
        "otpauth://totp/{issuer}:{account}?secret={secret}&issuer={issuer}&digits={DIGITS}&period={PERIOD}"
    );

    TotpProvisioning {
        secret,
        otpauth_url,
    }
}

/// Second factor backed by a persistent shared TOTP secret.
pub struct TotpFactor {
    secret: String,
}

impl TotpFactor {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl SecondFactor for TotpFactor {
    /// No per-attempt setup: the code comes from the user's device.
    fn begin(&mut self) -> bool {
        true
    }

    fn verify(&mut self, submitted: &str) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        verify_at(&self.secret, submitted, now)
    }
}

/// Compute the code for `unix_secs` (used by tests and enrolment
/// walkthroughs).  `None` if the secret is not valid base32.
pub fn code_at(secret_b32: &str, unix_secs: u64) -> Option<String> {
    let secret = decode_secret(secret_b32)?;
    Some(format_code(hotp(&secret, unix_secs / PERIOD)))
}

/// Check a submitted code against the current and adjacent windows.
///
/// Non-numeric or wrong-length input is rejected without raising.
pub fn verify_at(secret_b32: &str, submitted: &str, unix_secs: u64) -> bool {
    let submitted = submitted.trim();
    if submitted.len() != DIGITS as usize || !submitted.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let Some(secret) = decode_secret(secret_b32) else {
        return false;
    };

    let counter = unix_secs / PERIOD;
    let mut matched = false;
    for candidate in counter.saturating_sub(SKEW)..=counter + SKEW {
        let expected = format_code(hotp(&secret, candidate));
        // Constant-time comparison; every window is checked so timing
        // does not reveal which one matched.
        matched |= bool::from(submitted.as_bytes().ct_eq(expected.as_bytes()));
    }
    matched
}

/// Decode a base32 secret, tolerating whitespace and lowercase.
fn decode_secret(secret: &str) -> Option<Vec<u8>> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    BASE32_NOPAD.decode(normalized.as_bytes()).ok()
}

/// RFC 4226 HOTP: dynamic truncation of HMAC-SHA-1 over the counter.
fn hotp(secret: &[u8], counter: u64) -> u32 {
    // HMAC accepts keys of any length, so this cannot fail for a
    // decoded base32 secret.
    let Ok(mut mac) = HmacSha1::new_from_slice(secret) else {
        return 0;
    };
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    binary % 10u32.pow(DIGITS)
}

fn format_code(value: u32) -> String {
    format!("{value:0width$}", width = DIGITS as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 appendix B test secret ("12345678901234567890").
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn rfc_vectors_sha1() {
        // 8-digit reference values truncated to our 6-digit codes.
        assert_eq!(code_at(RFC_SECRET, 59).unwrap(), "287082");
        assert_eq!(code_at(RFC_SECRET, 1_111_111_109).unwrap(), "081804");
        assert_eq!(code_at(RFC_SECRET, 1_234_567_890).unwrap(), "005924");
    }

    #[test]
    fn accepts_adjacent_windows() {
        let now = 1_111_111_109;
        let previous = code_at(RFC_SECRET, now - 30).unwrap();
        let next = code_at(RFC_SECRET, now + 30).unwrap();
        assert!(verify_at(RFC_SECRET, &previous, now));
        assert!(verify_at(RFC_SECRET, &next, now));
    }

    #[test]
    fn rejects_beyond_skew_tolerance() {
        let now = 1_111_111_109;
        let stale = code_at(RFC_SECRET, now - 90).unwrap();
        assert!(!verify_at(RFC_SECRET, &stale, now));
    }

    #[test]
    fn rejects_non_numeric_input_without_raising() {
        assert!(!verify_at(RFC_SECRET, "abcdef", 59));
        assert!(!verify_at(RFC_SECRET, "28708", 59));
        assert!(!verify_at(RFC_SECRET, "", 59));
    }

    #[test]
    fn rejects_invalid_secret() {
        assert!(!verify_at("***", "287082", 59));
        assert!(code_at("***", 59).is_none());
    }

    #[test]
    fn tolerates_spaced_lowercase_secret() {
        let spaced = "gezd gnbv gy3t qojq gezd gnbv gy3t qojq";
        assert_eq!(code_at(spaced, 59).unwrap(), "287082");
    }
}
