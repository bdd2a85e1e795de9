//! The in-memory session key.
//!
//! After a successful unlock the verified password hash is used directly
//! as the AES-256 key for every item in the vault.  It lives only in
//! process memory and is wiped when dropped.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::kdf::KEY_LEN;

/// A wrapper around the 32-byte session key that automatically zeroes
/// its memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey {
    bytes: [u8; KEY_LEN],
}

impl SessionKey {
    /// Create a new `SessionKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (e.g. to key the cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl From<Zeroizing<[u8; KEY_LEN]>> for SessionKey {
    fn from(derived: Zeroizing<[u8; KEY_LEN]>) -> Self {
        Self::new(*derived)
    }
}

// Never print key material, even in debug output.
impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}
