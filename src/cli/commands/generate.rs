//! `passvault generate` — print a strong random password.

use crate::crypto::generate_strong_password;
use crate::crypto::generator::MIN_PASSWORD_LEN;
use crate::errors::Result;

use crate::cli::output;

/// Execute the `generate` command.  No authentication required.
pub fn execute(length: usize) -> Result<()> {
    if length < MIN_PASSWORD_LEN {
        output::tip(&format!(
            "Requested length {length} raised to the minimum of {MIN_PASSWORD_LEN}."
        ));
    }
    println!("{}", generate_strong_password(length));
    Ok(())
}
