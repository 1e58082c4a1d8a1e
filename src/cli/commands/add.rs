//! `passvault add` — store or update a credential for a service.

use crate::cli::{
    connect_store, load_settings, login_flow, output, prompt_password, prompt_text,
    second_factor_strategy, Cli,
};
use crate::errors::Result;
use crate::session::VaultSession;

/// Execute the `add` command.
pub fn execute(cli: &Cli, service: &str) -> Result<()> {
    let settings = load_settings(cli)?;
    let mut store = connect_store(cli, &settings)?;

    {
        let mut session = VaultSession::new(&store, second_factor_strategy(&settings)?);
        login_flow(&mut session)?;

        let username = prompt_text("Username")?;
        let secret = prompt_password(&format!("Password for {service}"))?;

        let mut proceed = true;
        if breached(&secret) {
            output::warning("This password has appeared in a known data breach!");
            proceed = confirm_store()?;
        }

        if proceed {
            session.add_entry(service, &username, &secret)?;
            output::success(&format!("Credential for '{service}' stored."));
        } else {
            output::info("Nothing stored.");
        }
    }

    store.close()?;
    Ok(())
}

fn confirm_store() -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt("Store it anyway?")
        .default(false)
        .interact()
        .map_err(|e| crate::errors::PassVaultError::CommandFailed(format!("prompt: {e}")))
}

/// Best-effort breach lookup; network trouble never blocks storing.
#[cfg(feature = "breach-check")]
fn breached(password: &str) -> bool {
    use crate::breach::{BreachChecker, HibpChecker};

    match HibpChecker::new().is_breached(password) {
        Ok(hit) => hit,
        Err(e) => {
            output::warning(&format!("Breach lookup unavailable: {e}"));
            false
        }
    }
}

#[cfg(not(feature = "breach-check"))]
fn breached(_password: &str) -> bool {
    false
}
