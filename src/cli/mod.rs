//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Parser;
use zeroize::Zeroizing;

use crate::auth::{AuthGate, LockState, VerifyOutcome};
use crate::config::Settings;
use crate::crypto::SessionKey;
use crate::errors::{Result, VaultError};

/// Minimum password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable holding the vault password (scripts and CI).
pub const PASSWORD_ENV: &str = "SECUREVAULT_PASSWORD";

/// Environment variable holding the replacement password for `change-password`.
pub const NEW_PASSWORD_ENV: &str = "SECUREVAULT_NEW_PASSWORD";

/// Directory name used under `$HOME` when `--vault-dir` is not given.
const DEFAULT_VAULT_DIR: &str = "SecureVault";

/// SecureVault CLI: offline, password-gated encrypted file vault.
#[derive(Parser)]
#[command(
    name = "securevault",
    about = "Offline, password-gated encrypted file vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault directory (default: ~/SecureVault)
    #[arg(long, env = "SECUREVAULT_DIR", global = true)]
    pub vault_dir: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault and choose its password
    Init,

    /// Encrypt a file into the vault
    Add {
        /// File to encrypt
        file: PathBuf,
        /// Securely erase the original file after it was stored
        #[arg(long)]
        wipe_original: bool,
    },

    /// List the items stored in the vault
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decrypt an item back to a regular file
    Extract {
        /// Item file name as shown by `list`
        item: String,
        /// Output directory (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Securely erase an item from the vault
    Delete {
        /// Item file name as shown by `list`
        item: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Securely erase any file (overwrite, then unlink)
    Wipe {
        /// File to erase
        file: PathBuf,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Change the vault password
    ChangePassword {
        /// Skip the confirmation prompt shown when items exist
        #[arg(short, long)]
        force: bool,
    },

    /// Show vault location, lock state and settings
    Status,

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the vault directory: `--vault-dir` / `SECUREVAULT_DIR`, else
/// `~/SecureVault`.
pub fn resolve_vault_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.vault_dir {
        return Ok(dir.clone());
    }

    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .ok_or_else(|| {
            VaultError::ConfigError(
                "cannot find a home directory; pass --vault-dir or set SECUREVAULT_DIR".into(),
            )
        })?;
    Ok(PathBuf::from(home).join(DEFAULT_VAULT_DIR))
}

/// Get the vault password, trying in order:
/// 1. `SECUREVAULT_PASSWORD` env var (scripts/CI)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password twice (used by `init` and `change-password`).
///
/// `env_var` is checked first for scripted usage.  Enforces a minimum
/// length; a confirmation that does not match fails with `PasswordMismatch`.
pub fn prompt_new_password(env_var: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(env_var) {
        if !pw.is_empty() {
            if pw.len() < MIN_PASSWORD_LEN {
                return Err(VaultError::CommandFailed(format!(
                    "password must be at least {MIN_PASSWORD_LEN} characters"
                )));
            }
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let password = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose vault password")
                .interact()
                .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?,
        );

        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        let confirmation = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Confirm vault password")
                .interact()
                .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?,
        );
        if *confirmation != *password {
            return Err(VaultError::PasswordMismatch);
        }

        return Ok(password);
    }
}

/// Unlock the vault at `vault_dir` and return the session key.
///
/// A locked vault is refused before any password is requested.  A wrong
/// password is recorded in the audit log and surfaces as
/// `IncorrectPassword`.
pub fn unlock(vault_dir: &Path, settings: &Settings) -> Result<(AuthGate, SessionKey)> {
    let mut gate = AuthGate::load(vault_dir, settings.lockout_policy())?;

    if let LockState::Locked { remaining_secs } = gate.check_lockout(Utc::now()) {
        return Err(VaultError::LockedOut(remaining_secs));
    }

    let password = prompt_password("Enter vault password")?;
    match gate.verify(password.as_bytes(), Utc::now())? {
        VerifyOutcome::Accepted(key) => Ok((gate, key)),
        VerifyOutcome::Rejected {
            failed_attempts, ..
        } => {
            let locked_for = record_failed_attempt(vault_dir, &gate);
            Err(VaultError::IncorrectPassword {
                failed_attempts,
                locked_for,
            })
        }
    }
}

/// Audit a rejected password and, if it tripped the lock, the lockout.
///
/// Returns the remaining lock time in seconds when the gate is now locked.
pub fn record_failed_attempt(vault_dir: &Path, gate: &AuthGate) -> Option<u64> {
    let failed = gate.credential().failed_attempts;
    audit(
        vault_dir,
        "unlock-failed",
        None,
        Some(&format!("attempt {failed}")),
    );

    match gate.check_lockout(Utc::now()) {
        LockState::Locked { remaining_secs } => {
            audit(
                vault_dir,
                "lockout",
                None,
                Some(&format!("locked for {remaining_secs}s")),
            );
            Some(remaining_secs)
        }
        LockState::Open => None,
    }
}

/// Record an operation in the audit log, if audit logging is compiled in.
pub fn audit(vault_dir: &Path, op: &str, item: Option<&str>, details: Option<&str>) {
    #[cfg(feature = "audit-log")]
    crate::audit::log_audit(vault_dir, op, item, details);

    #[cfg(not(feature = "audit-log"))]
    let _ = (vault_dir, op, item, details);
}
