//! `passvault breach` — check a password against known breaches.

use crate::cli::output;
use crate::errors::Result;

/// Execute the `breach` command.
#[cfg(feature = "breach-check")]
pub fn execute() -> Result<()> {
    use crate::breach::{BreachChecker, HibpChecker};
    use crate::cli::prompt_password;

    let password = prompt_password("Password to check")?;

    if HibpChecker::new().is_breached(&password)? {
        output::warning("This password has appeared in a known data breach!");
        output::tip("Run `passvault generate` for a strong replacement.");
    } else {
        output::success("Password not found in known breaches.");
    }
    Ok(())
}

#[cfg(not(feature = "breach-check"))]
pub fn execute() -> Result<()> {
    output::error("This build has no breach lookup (compiled without `breach-check`).");
    Err(crate::errors::PassVaultError::ConfigError(
        "breach-check feature disabled".into(),
    ))
}
