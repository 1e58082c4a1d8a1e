use clap::Parser;
use passvault::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    // Diagnostics go to stderr; control with PASSVAULT_LOG (e.g.
    // PASSVAULT_LOG=debug), defaulting to warnings only.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PASSVAULT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Register => passvault::cli::commands::register::execute(&cli),
        Commands::Add { ref service } => passvault::cli::commands::add::execute(&cli, service),
        Commands::Get { ref service } => passvault::cli::commands::get::execute(&cli, service),
        Commands::List => passvault::cli::commands::list::execute(&cli),
        Commands::Generate { length } => passvault::cli::commands::generate::execute(length),
        Commands::Breach => passvault::cli::commands::breach_cmd::execute(),
        Commands::Rotate => passvault::cli::commands::rotate::execute(&cli),
        Commands::Import { ref file } => passvault::cli::commands::import_cmd::execute(&cli, file),
        Commands::Completions { ref shell } => {
            passvault::cli::commands::completions::execute(shell)
        }
    };

    if let Err(e) = result {
        passvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
