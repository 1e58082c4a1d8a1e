//! Breach-check collaborator.
//!
//! The core only defines the [`BreachChecker`] capability; the bundled
//! implementation queries the Have I Been Pwned k-anonymity range API
//! and ships behind the `breach-check` feature so offline builds skip
//! the HTTP dependency entirely.

use crate::errors::Result;

/// External lookup: has this password appeared in a known breach?
pub trait BreachChecker {
    fn is_breached(&self, password: &str) -> Result<bool>;
}

/// Scan a range-API response body for a hash suffix.
///
/// The body is one `SUFFIX:COUNT` pair per line; matching is
/// case-insensitive because the API historically answered in
/// uppercase.
pub fn suffix_in_response(body: &str, suffix: &str) -> bool {
    body.lines().any(|line| {
        line.split(':')
            .next()
            .is_some_and(|candidate| candidate.trim().eq_ignore_ascii_case(suffix))
    })
}

#[cfg(feature = "breach-check")]
pub use hibp::HibpChecker;

#[cfg(feature = "breach-check")]
mod hibp {
    use data_encoding::HEXUPPER;
    use sha1::{Digest, Sha1};

    use crate::errors::{PassVaultError, Result};

    use super::{suffix_in_response, BreachChecker};

    const DEFAULT_API_BASE: &str = "https://api.pwnedpasswords.com/range";

    /// Have I Been Pwned range-query client.  Only the first five hex
    /// characters of the SHA-1 digest ever leave the machine.
    pub struct HibpChecker {
        api_base: String,
    }

    impl HibpChecker {
        pub fn new() -> Self {
            Self {
                api_base: DEFAULT_API_BASE.to_string(),
            }
        }

        /// Point the client at a different endpoint (tests).
        pub fn with_api_base(api_base: impl Into<String>) -> Self {
            Self {
                api_base: api_base.into(),
            }
        }
    }

    impl Default for HibpChecker {
        fn default() -> Self {
            Self::new()
        }
    }

    impl BreachChecker for HibpChecker {
        fn is_breached(&self, password: &str) -> Result<bool> {
            let digest = HEXUPPER.encode(&Sha1::digest(password.as_bytes()));
            let (prefix, suffix) = digest.split_at(5);

            let body = ureq::get(&format!("{}/{prefix}", self.api_base))
                .set(
                    "User-Agent",
                    concat!("passvault/", env!("CARGO_PKG_VERSION")),
                )
                .call()
                .map_err(|e| PassVaultError::BreachLookupFailed(e.to_string()))?
                .into_string()
                .map_err(|e| PassVaultError::BreachLookupFailed(e.to_string()))?;

            Ok(suffix_in_response(&body, suffix))
        }
    }
}
