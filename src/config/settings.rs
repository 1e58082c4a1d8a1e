use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{PassVaultError, Result};

/// Project-level configuration, loaded from `passvault.toml`.
///
/// Every field has a sensible default so PassVault works out-of-the-box
/// without any config file at all.  The shipped `remote_db` default is
/// a placeholder; the remote tier stays unconfigured until it is
/// replaced with a real target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to the project root) holding vault data.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    /// File name of the local database inside `vault_dir`.
    #[serde(default = "default_local_db")]
    pub local_db: String,

    /// Remote/cloud database target.  A value still carrying a
    /// `<placeholder>` marker (or an empty string) means "unconfigured".
    #[serde(default = "default_remote_db")]
    pub remote_db: String,

    /// Second-factor strategy: "totp" or "email".
    #[serde(default = "default_second_factor")]
    pub second_factor: String,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_dir() -> String {
    ".passvault".to_string()
}

fn default_local_db() -> String {
    "local.db".to_string()
}

fn default_remote_db() -> String {
    "<remote-db-path>".to_string()
}

fn default_second_factor() -> String {
    "totp".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_dir: default_vault_dir(),
            local_db: default_local_db(),
            remote_db: default_remote_db(),
            second_factor: default_second_factor(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = "passvault.toml";

    /// Load settings from `<project_dir>/passvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            PassVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Full path to the local database file.
    pub fn local_db_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_dir).join(&self.local_db)
    }

    /// The remote target, or `None` while it is unconfigured (empty or
    /// still carrying a `<placeholder>` marker).
    pub fn remote_target(&self) -> Option<&str> {
        let target = self.remote_db.trim();
        if target.is_empty() || target.contains('<') {
            None
        } else {
            Some(target)
        }
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> crate::crypto::kdf::Argon2Params {
        crate::crypto::kdf::Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_no_config_file() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.vault_dir, ".passvault");
        assert_eq!(settings.second_factor, "totp");
        assert!(settings.remote_target().is_none());
    }

    #[test]
    fn parses_config_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("passvault.toml"),
            "vault_dir = \"data\"\nremote_db = \"/mnt/sync/vault.db\"\n",
        )
        .unwrap();

        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.vault_dir, "data");
        assert_eq!(settings.remote_target(), Some("/mnt/sync/vault.db"));
        // Unspecified fields fall back to defaults.
        assert_eq!(settings.argon2_iterations, 3);
    }

    #[test]
    fn placeholder_remote_counts_as_unconfigured() {
        let settings = Settings {
            remote_db: "<remote-db-path>".into(),
            ..Settings::default()
        };
        assert!(settings.remote_target().is_none());

        let settings = Settings {
            remote_db: "   ".into(),
            ..Settings::default()
        };
        assert!(settings.remote_target().is_none());
    }

    #[test]
    fn rejects_malformed_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("passvault.toml"), "vault_dir = [not toml").unwrap();
        assert!(Settings::load(dir.path()).is_err());
    }

    #[test]
    fn local_db_path_is_under_vault_dir() {
        let settings = Settings::default();
        let path = settings.local_db_path(Path::new("/tmp/project"));
        assert_eq!(path, Path::new("/tmp/project/.passvault/local.db"));
    }
}
