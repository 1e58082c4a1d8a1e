//! `passvault list` — list stored credentials without secrets.

use crate::cli::{connect_store, load_settings, login_flow, output, second_factor_strategy, Cli};
use crate::errors::Result;
use crate::session::VaultSession;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let mut store = connect_store(cli, &settings)?;

    {
        let mut session = VaultSession::new(&store, second_factor_strategy(&settings)?);
        login_flow(&mut session)?;

        let entries = session.list_entries()?;
        output::print_entries_table(&entries);
    }

    store.close()?;
    Ok(())
}
