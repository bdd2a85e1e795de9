use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::auth::LockoutPolicy;
use crate::errors::{Result, VaultError};

/// Vault-level configuration, loaded from `<vault_dir>/securevault.toml`.
///
/// Every field has a sensible default so SecureVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// PBKDF2 iteration count for new or changed passwords (default: 200 000).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Consecutive failed unlocks before the vault locks (default: 5).
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,

    /// Lock duration in seconds (default: 60).
    #[serde(default = "default_lockout_seconds")]
    pub lockout_seconds: u32,

    /// Overwrite passes used by secure delete (default: 3).
    #[serde(default = "default_wipe_passes")]
    pub wipe_passes: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_kdf_iterations() -> u32 {
    crate::crypto::DEFAULT_ITERATIONS
}

fn default_max_failed_attempts() -> u32 {
    5
}

fn default_lockout_seconds() -> u32 {
    60
}

fn default_wipe_passes() -> u32 {
    crate::eraser::DEFAULT_PASSES
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            kdf_iterations: default_kdf_iterations(),
            max_failed_attempts: default_max_failed_attempts(),
            lockout_seconds: default_lockout_seconds(),
            wipe_passes: default_wipe_passes(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the vault directory.
    pub const FILE_NAME: &'static str = "securevault.toml";

    /// Load settings from `<vault_dir>/securevault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, or asks for unsafe
    /// values, an error is returned.
    pub fn load(vault_dir: &Path) -> Result<Self> {
        let config_path = Self::path_in(vault_dir);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Path of the config file inside `vault_dir`.
    pub fn path_in(vault_dir: &Path) -> PathBuf {
        vault_dir.join(Self::FILE_NAME)
    }

    /// Reject settings that would disable a protection outright.
    pub fn validate(&self) -> Result<()> {
        if self.kdf_iterations < 1 {
            return Err(VaultError::ConfigError(
                "kdf_iterations must be at least 1".into(),
            ));
        }
        if self.max_failed_attempts < 1 {
            return Err(VaultError::ConfigError(
                "max_failed_attempts must be at least 1".into(),
            ));
        }
        if self.lockout_seconds < 1 {
            return Err(VaultError::ConfigError(
                "lockout_seconds must be at least 1".into(),
            ));
        }
        if self.wipe_passes < 1 {
            return Err(VaultError::ConfigError(
                "wipe_passes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Convert the lockout settings into the gate's policy.
    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            max_failed_attempts: self.max_failed_attempts,
            lockout_seconds: self.lockout_seconds,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
