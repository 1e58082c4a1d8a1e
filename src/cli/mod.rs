//! CLI module — Clap argument parser, prompt helpers, and command
//! implementations.

pub mod commands;
pub mod output;

use std::path::Path;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{PassVaultError, Result};
use crate::session::VaultSession;
use crate::store::VaultStore;
use crate::twofactor::SecondFactorStrategy;

/// Second-factor attempts allowed per login before giving up.  The
/// master password stays verified between attempts.
const MAX_FACTOR_ATTEMPTS: u32 = 3;

/// PassVault CLI: encrypted password manager with two-factor login.
#[derive(Parser)]
#[command(
    name = "passvault",
    about = "Encrypted password manager with two-factor login",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project directory holding passvault.toml and the vault data
    #[arg(long, default_value = ".", global = true)]
    pub dir: String,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Register a new vault owner (prints TOTP enrolment + backup codes)
    Register,

    /// Store or update a credential for a service
    Add {
        /// Service name (e.g. github)
        service: String,
    },

    /// Retrieve and decrypt the credential for a service
    Get {
        /// Service name
        service: String,
    },

    /// List stored credentials (no secrets shown)
    List,

    /// Generate a strong random password
    Generate {
        /// Password length (clamped up to a minimum of 8)
        #[arg(short, long, default_value_t = 16)]
        length: usize,
    },

    /// Check a password against known data breaches
    Breach,

    /// Change the master password (re-encrypts all entries)
    Rotate,

    /// Import credentials from a JSON file, replacing the current set
    Import {
        /// Path to a JSON array of {service, username, password}
        file: String,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

/// Load settings from the project directory given on the command line.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    Settings::load(Path::new(&cli.dir))
}

/// Resolve the storage backends for this invocation.
pub fn connect_store(cli: &Cli, settings: &Settings) -> Result<VaultStore> {
    let store = VaultStore::connect(settings, Path::new(&cli.dir))?;
    if store.primary_is_remote() {
        output::warning("Local backend unreachable — operating on the remote backend.");
    } else if !store.has_replica() && settings.remote_target().is_some() {
        output::warning("Remote replica unreachable — operating local-only.");
    }
    Ok(store)
}

/// Map the configured strategy name onto the library type.
///
/// The email-code strategy needs an out-of-band delivery collaborator,
/// which the CLI does not ship; it is available to library embedders.
pub fn second_factor_strategy(settings: &Settings) -> Result<SecondFactorStrategy> {
    match settings.second_factor.as_str() {
        "totp" => Ok(SecondFactorStrategy::Totp),
        "email" => Err(PassVaultError::ConfigError(
            "the email-code strategy requires an external delivery sink; \
             the CLI supports `second_factor = \"totp\"`"
                .into(),
        )),
        other => Err(PassVaultError::ConfigError(format!(
            "unknown second_factor '{other}' (expected \"totp\" or \"email\")"
        ))),
    }
}

/// Secure password prompt.
pub fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    let password = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| PassVaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(password))
}

/// Prompt for a new password twice; a mismatch is an error, not a loop.
pub fn prompt_new_password(prompt: &str) -> Result<Zeroizing<String>> {
    let first = prompt_password(prompt)?;
    let second = prompt_password("Confirm")?;
    if *first != *second {
        return Err(PassVaultError::PasswordMismatch);
    }
    Ok(first)
}

/// Plain text prompt.
pub fn prompt_text(prompt: &str) -> Result<String> {
    dialoguer::Input::<String>::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| PassVaultError::CommandFailed(format!("input prompt: {e}")))
}

/// Interactive login: master password, then up to three second-factor
/// attempts.  Returns the master password for commands that need it
/// again (rotate).
pub fn login_flow(session: &mut VaultSession<'_>) -> Result<Zeroizing<String>> {
    let email = prompt_text("Email")?;
    let password = prompt_password("Master password")?;
    session.login(&email, &password)?;

    for attempt in 1..=MAX_FACTOR_ATTEMPTS {
        if !session.begin_second_factor()? {
            output::warning("Could not issue a verification code.");
        }
        let code = prompt_text("Second-factor code (or a backup code)")?;
        if session.verify_second_factor(&code)? {
            return Ok(password);
        }
        if attempt < MAX_FACTOR_ATTEMPTS {
            output::warning(&format!(
                "Invalid code (attempt {attempt}/{MAX_FACTOR_ATTEMPTS}) — try again."
            ));
        }
    }

    session.abandon();
    Err(PassVaultError::CommandFailed(
        "second-factor verification failed".into(),
    ))
}
