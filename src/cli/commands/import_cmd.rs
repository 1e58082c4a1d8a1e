//! `passvault import` — bulk-replace the credential set from JSON.
//!
//! The file is a JSON array of `{service, username, password}` objects.
//! The replace is not atomic; an interrupted import can leave a partial
//! record set.

use std::fs;

use crate::cli::{connect_store, load_settings, login_flow, output, second_factor_strategy, Cli};
use crate::errors::{PassVaultError, Result};
use crate::session::VaultSession;
use crate::store::PlainEntry;

/// Execute the `import` command.
pub fn execute(cli: &Cli, file: &str) -> Result<()> {
    let settings = load_settings(cli)?;

    let contents = fs::read_to_string(file)?;
    let entries: Vec<PlainEntry> = serde_json::from_str(&contents)
        .map_err(|e| PassVaultError::SerializationError(format!("{file}: {e}")))?;

    let mut store = connect_store(cli, &settings)?;
    {
        let mut session = VaultSession::new(&store, second_factor_strategy(&settings)?);
        login_flow(&mut session)?;

        output::warning("Importing replaces ALL stored credentials for this account.");
        session.replace_entries(&entries)?;
        output::success(&format!("Imported {} credential(s).", entries.len()));
    }

    store.close()?;
    Ok(())
}
