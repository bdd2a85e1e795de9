//! Cryptographic primitives for SecureVault.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 password-based key derivation (`kdf`)
//! - The zeroize-on-drop session key (`keys`)
//! - Incremental AES-256-GCM for streaming vault items (`encryption`)

pub mod encryption;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{derive_key, SessionKey, ...};
pub use encryption::{GcmAuthenticator, GcmKeystream, IV_LEN, TAG_LEN};
pub use kdf::{derive_key, generate_salt, DEFAULT_ITERATIONS, KEY_LEN, SALT_LEN};
pub use keys::SessionKey;
