//! Cryptographic primitives for PassVault.
//!
//! This module provides:
//! - Argon2id password-based key derivation (`kdf`)
//! - HKDF-based per-entry key derivation and the `MasterKey` wrapper (`keys`)
//! - AES-256-GCM entry encryption via `SecretCipher` (`cipher`)
//! - Argon2id PHC-string master password hashing (`hashing`)
//! - Strong random password generation (`generator`)

pub mod cipher;
pub mod generator;
pub mod hashing;
pub mod kdf;
pub mod keys;

pub use cipher::SecretCipher;
pub use generator::generate_strong_password;
pub use hashing::{hash_password, verify_password};
pub use kdf::{derive_master_key, generate_salt, Argon2Params};
pub use keys::MasterKey;
