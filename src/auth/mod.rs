//! Authentication module — the credential record and the unlock gate.
//!
//! This module provides:
//! - `VaultCredential`, the persisted salt/hash/lockout record (`credential`)
//! - `AuthGate`, the lockout state machine built on top of it (`gate`)

pub mod credential;
pub mod gate;

// Re-export the most commonly used items.
pub use credential::{VaultCredential, CREDENTIAL_FILE};
pub use gate::{AuthGate, LockState, LockoutPolicy, VerifyOutcome};
