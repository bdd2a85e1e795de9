//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The derived 32 bytes double as the stored password hash and as the
//! AES-256 session key, so the same password + salt + iteration count
//! must always produce the same output.

use hmac::Hmac;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Default PBKDF2 iteration count for new credentials.
pub const DEFAULT_ITERATIONS: u32 = 200_000;

/// Derive a 32-byte key from a password and salt.
///
/// The result is wrapped in `Zeroizing` so it is wiped when the caller
/// drops it without moving it into a longer-lived key type.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    if iterations < 1 {
        return Err(VaultError::KdfFailure(
            "PBKDF2 iterations must be at least 1".into(),
        ));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt, iterations, &mut key[..])
        .map_err(|e| VaultError::KdfFailure(format!("PBKDF2-HMAC-SHA256 failed: {e}")))?;

    Ok(key)
}

/// Generate a fresh random salt from the supplied CSPRNG.
pub fn generate_salt<R: CryptoRng + ?Sized>(rng: &mut R) -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    salt
}
