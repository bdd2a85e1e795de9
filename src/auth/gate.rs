//! The authentication gate.
//!
//! Wraps the persisted `VaultCredential` with the unlock state machine:
//!
//! - **Open**: `now >= lock_until`; an attempt may be made.
//! - **Locked**: `now < lock_until`; attempts are refused without running
//!   the KDF and without touching the counters.
//!
//! Every transition is written to disk before the caller sees the result,
//! so restarting the process never resets the failure counter.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::CryptoRng;
use subtle::ConstantTimeEq;

use super::credential::VaultCredential;
use crate::crypto::kdf::{derive_key, generate_salt};
use crate::crypto::SessionKey;
use crate::errors::{Result, VaultError};

/// When to lock and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Consecutive failures that trigger a lock (default: 5).
    pub max_failed_attempts: u32,
    /// Length of the lock window in seconds (default: 60).
    pub lockout_seconds: u32,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_seconds: 60,
        }
    }
}

/// Result of `AuthGate::check_lockout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Open,
    Locked { remaining_secs: u64 },
}

/// Result of a password check that was allowed to run.
#[derive(Debug)]
pub enum VerifyOutcome {
    /// The password matched; the verified hash is the session key.
    Accepted(SessionKey),
    /// The password did not match.
    Rejected {
        failed_attempts: u32,
        /// Set when this attempt (re)armed the lock.
        locked_until: Option<DateTime<Utc>>,
    },
}

/// The unlock state machine for one vault directory.
pub struct AuthGate {
    path: PathBuf,
    credential: VaultCredential,
    policy: LockoutPolicy,
}

impl AuthGate {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// First-run setup: mint a salt, hash the password, and persist a
    /// fresh credential in `vault_dir`.
    pub fn initialize<R: CryptoRng + ?Sized>(
        vault_dir: &Path,
        password: &[u8],
        iterations: u32,
        policy: LockoutPolicy,
        rng: &mut R,
    ) -> Result<Self> {
        let path = VaultCredential::path_in(vault_dir);
        if path.exists() {
            return Err(VaultError::VaultAlreadyInitialized(vault_dir.to_path_buf()));
        }

        let salt = generate_salt(rng);
        let hash = derive_key(password, &salt, iterations)?;
        let credential = VaultCredential::new(salt, *hash, iterations);
        credential.save(&path)?;

        Ok(Self {
            path,
            credential,
            policy,
        })
    }

    /// Load the credential stored in `vault_dir`.
    pub fn load(vault_dir: &Path, policy: LockoutPolicy) -> Result<Self> {
        let path = VaultCredential::path_in(vault_dir);
        let credential = VaultCredential::load(&path)?;
        Ok(Self {
            path,
            credential,
            policy,
        })
    }

    /// Returns `true` if `vault_dir` already holds a credential.
    pub fn is_initialized(vault_dir: &Path) -> bool {
        VaultCredential::path_in(vault_dir).exists()
    }

    // ------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------

    /// Pure read of the lock state at `now`.  Remaining time is rounded up
    /// to whole seconds.
    pub fn check_lockout(&self, now: DateTime<Utc>) -> LockState {
        let now_ms = now.timestamp_millis();
        let until = self.credential.lock_until_ms;
        if now_ms < until {
            let remaining_ms = u64::try_from(until - now_ms).unwrap_or(u64::MAX);
            LockState::Locked {
                remaining_secs: remaining_ms.saturating_add(999) / 1000,
            }
        } else {
            LockState::Open
        }
    }

    /// Check `password` against the stored hash.
    ///
    /// Fails with `LockedOut`, without deriving anything, while the gate
    /// is locked.  Otherwise the comparison runs in constant time and the
    /// resulting counter update is persisted before returning.
    pub fn verify(&mut self, password: &[u8], now: DateTime<Utc>) -> Result<VerifyOutcome> {
        if let LockState::Locked { remaining_secs } = self.check_lockout(now) {
            return Err(VaultError::LockedOut(remaining_secs));
        }

        let candidate = derive_key(password, &self.credential.salt, self.credential.iterations)?;
        let matches: bool = candidate[..].ct_eq(&self.credential.hash[..]).into();

        let mut next = self.credential.clone();
        if matches {
            next.failed_attempts = 0;
            next.lock_until_ms = 0;
            self.commit(next)?;
            return Ok(VerifyOutcome::Accepted(SessionKey::from(candidate)));
        }

        next.failed_attempts = next.failed_attempts.saturating_add(1);
        let mut locked_until = None;
        if next.failed_attempts >= self.policy.max_failed_attempts {
            let lock_ms = now.timestamp_millis() + i64::from(self.policy.lockout_seconds) * 1000;
            // Never shorten an existing lock.
            next.lock_until_ms = next.lock_until_ms.max(lock_ms);
            locked_until = DateTime::from_timestamp_millis(next.lock_until_ms);
        }
        let failed_attempts = next.failed_attempts;
        self.commit(next)?;

        Ok(VerifyOutcome::Rejected {
            failed_attempts,
            locked_until,
        })
    }

    /// Replace the password.
    ///
    /// `old_password` goes through `verify` first, so a wrong guess counts
    /// toward the lockout exactly like a failed unlock.  On success a new
    /// salt is minted, `new_password` is hashed at `iterations`, the
    /// counters are cleared, and the new session key is returned.
    pub fn change_password<R: CryptoRng + ?Sized>(
        &mut self,
        old_password: &[u8],
        new_password: &[u8],
        iterations: u32,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<SessionKey> {
        match self.verify(old_password, now)? {
            VerifyOutcome::Accepted(_old_key) => {}
            VerifyOutcome::Rejected { .. } => return Err(VaultError::WrongCurrentPassword),
        }

        let salt = generate_salt(rng);
        let hash = derive_key(new_password, &salt, iterations)?;
        self.commit(VaultCredential::new(salt, *hash, iterations))?;

        Ok(SessionKey::from(hash))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the persisted credential.
    pub fn credential(&self) -> &VaultCredential {
        &self.credential
    }

    /// Persist first, then adopt. Memory never runs ahead of disk.
    fn commit(&mut self, next: VaultCredential) -> Result<()> {
        next.save(&self.path)?;
        self.credential = next;
        Ok(())
    }
}
