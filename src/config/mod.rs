//! Configuration loaded from `passvault.toml`.

pub mod settings;

pub use settings::Settings;
