use thiserror::Error;

/// All errors that can occur in PassVault.
#[derive(Debug, Error)]
pub enum PassVaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong master password or corrupted record")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    // --- Storage errors ---
    #[error("No storage backend reachable: {0}")]
    StorageUnavailable(String),

    #[error("Storage connection is closed")]
    ConnectionClosed,

    #[error("Storage operation failed: {0}")]
    OperationFailed(String),

    // --- Expected user-facing outcomes ---
    #[error("'{0}' not found")]
    NotFound(String),

    #[error("'{0}' already exists")]
    AlreadyExists(String),

    #[error("Invalid email or master password")]
    InvalidCredential,

    #[error("Not authenticated — log in first")]
    NotAuthenticated,

    // --- Config errors ---
    #[error("Config error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Password mismatch — passwords do not match")]
    PasswordMismatch,

    // --- Breach lookup ---
    #[error("Breach lookup failed: {0}")]
    BreachLookupFailed(String),
}

/// Convenience type alias for PassVault results.
pub type Result<T> = std::result::Result<T, PassVaultError>;
