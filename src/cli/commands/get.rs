//! `passvault get` — retrieve and decrypt a single credential.

use crate::cli::{connect_store, load_settings, login_flow, second_factor_strategy, Cli};
use crate::errors::Result;
use crate::session::VaultSession;

/// Execute the `get` command.
pub fn execute(cli: &Cli, service: &str) -> Result<()> {
    let settings = load_settings(cli)?;
    let mut store = connect_store(cli, &settings)?;

    {
        let mut session = VaultSession::new(&store, second_factor_strategy(&settings)?);
        login_flow(&mut session)?;

        let entry = session.get_entry(service)?;
        println!("Service:  {}", entry.service);
        println!("Username: {}", entry.username);
        println!("Password: {}", entry.secret);
    }

    store.close()?;
    Ok(())
}
