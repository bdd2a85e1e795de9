use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in SecureVault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Crypto errors ---
    #[error("Key derivation failed: {0}")]
    KdfFailure(String),

    #[error("Authentication failed — wrong password or corrupted/tampered item")]
    AuthenticationFailure,

    #[error("Payload of {0} bytes exceeds the AES-GCM limit")]
    PayloadTooLarge(u64),

    // --- Authentication gate errors ---
    #[error("Vault is temporarily locked due to failed attempts — try again in {0}s")]
    LockedOut(u64),

    #[error("Incorrect password ({failed_attempts} failed attempt(s)){}", lock_suffix(.locked_for))]
    IncorrectPassword {
        failed_attempts: u32,
        /// Seconds the vault is now locked for, if this attempt tripped the lockout.
        locked_for: Option<u64>,
    },

    #[error("Wrong current password")]
    WrongCurrentPassword,

    #[error("No vault found at {0} — run `securevault init` first")]
    VaultNotInitialized(PathBuf),

    #[error("Vault already initialized at {0}")]
    VaultAlreadyInitialized(PathBuf),

    #[error("Credential record error: {0}")]
    CredentialError(String),

    // --- Envelope format errors ---
    #[error("Bad magic — not a SecureVault item")]
    BadMagic,

    #[error("Unsupported item format version {0}")]
    UnsupportedVersion(u8),

    #[error("Item is truncated: {0}")]
    Truncated(String),

    #[error("Original filename is {0} bytes, the limit is 65535")]
    NameTooLong(usize),

    #[error("Expected {expected} plaintext bytes but read {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    // --- Item store errors ---
    #[error("No such vault item: {0}")]
    ItemNotFound(String),

    #[error("Vault item already exists: {0}")]
    ItemAlreadyExists(String),

    #[error("Invalid vault item name '{0}'")]
    InvalidItemName(String),

    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    // --- Config errors ---
    #[error("Config file error: {0}")]
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

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Password mismatch — passwords do not match")]
    PasswordMismatch,

    #[error("Audit error: {0}")]
    AuditError(String),
}

impl VaultError {
    /// Returns `true` for errors after which the session cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::KdfFailure(_))
    }
}

fn lock_suffix(locked_for: &Option<u64>) -> String {
    match locked_for {
        Some(secs) => format!(", vault locked for {secs}s"),
        None => String::new(),
    }
}

/// Convenience type alias for SecureVault results.
pub type Result<T> = std::result::Result<T, VaultError>;
