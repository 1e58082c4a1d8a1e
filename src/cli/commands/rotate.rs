//! `passvault rotate` — change the master password.
//!
//! Every stored entry is decrypted with the old key and re-encrypted
//! under the new one, so the change touches the whole entry set.

use crate::cli::{
    connect_store, load_settings, login_flow, output, prompt_new_password,
    second_factor_strategy, Cli,
};
use crate::errors::Result;
use crate::session::VaultSession;

/// Execute the `rotate` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let mut store = connect_store(cli, &settings)?;

    {
        let mut session = VaultSession::with_kdf_params(
            &store,
            second_factor_strategy(&settings)?,
            settings.argon2_params(),
        );
        let current = login_flow(&mut session)?;

        let new = prompt_new_password("New master password")?;
        session.change_master_password(&current, &new)?;
        output::success("Master password changed; all entries re-encrypted.");
    }

    store.close()?;
    Ok(())
}
