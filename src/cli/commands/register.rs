//! `passvault register` — provision a new vault owner.

use crate::cli::{connect_store, load_settings, output, prompt_new_password, prompt_text, Cli};
use crate::errors::Result;
use crate::session::VaultSession;
use crate::twofactor::SecondFactorStrategy;

/// Execute the `register` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let mut store = connect_store(cli, &settings)?;

    let email = prompt_text("Email")?;
    let password = prompt_new_password("Master password")?;

    let registration = {
        // Registration does not verify a factor, so the strategy choice
        // does not matter here; TOTP material is provisioned either way.
        let mut session = VaultSession::with_kdf_params(
            &store,
            SecondFactorStrategy::Totp,
            settings.argon2_params(),
        );
        session.register(&email, &password)?
    };

    output::success(&format!("Registered '{email}'."));
    output::info("Add this account to your authenticator app:");
    println!("  {}", registration.totp.otpauth_url);
    output::tip(&format!(
        "Manual entry secret: {}",
        registration.totp.secret
    ));

    output::info("Backup codes (each works once — store them somewhere safe):");
    for code in &registration.backup_codes {
        println!("  {code}");
    }

    store.close()?;
    Ok(())
}
