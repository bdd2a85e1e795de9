//! `securevault change-password` — replace the vault password.
//!
//! Mints a fresh salt and re-derives the hash from the new password.
//! Items are not re-encrypted: anything already in the vault stays bound
//! to the old key and can no longer be extracted after the change, so the
//! command asks for confirmation whenever items exist.

use chrono::Utc;
use dialoguer::Confirm;

use crate::auth::{AuthGate, LockState};
use crate::cli::output;
use crate::cli::{
    audit, prompt_new_password, prompt_password, record_failed_attempt, resolve_vault_dir, Cli,
    NEW_PASSWORD_ENV,
};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::VaultStore;

/// Execute the `change-password` command.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    let vault_dir = resolve_vault_dir(cli)?;
    let settings = Settings::load(&vault_dir)?;
    let mut gate = AuthGate::load(&vault_dir, settings.lockout_policy())?;

    if let LockState::Locked { remaining_secs } = gate.check_lockout(Utc::now()) {
        return Err(VaultError::LockedOut(remaining_secs));
    }

    // 1. Existing items cannot be read with the new key.
    let item_count = VaultStore::open(&vault_dir)?.item_count()?;
    if item_count > 0 {
        output::warning(&format!(
            "{item_count} item(s) are encrypted with the current password and will \
             NOT be readable after the change. Extract them first."
        ));
        if !force {
            let confirmed = Confirm::new()
                .with_prompt("Change the password anyway?")
                .default(false)
                .interact()
                .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;
            if !confirmed {
                return Err(VaultError::UserCancelled);
            }
        }
    }

    // 2. Current password, then the new one.
    output::info("Enter your current vault password.");
    let old_password = prompt_password("Current vault password")?;
    output::info("Choose your new vault password.");
    let new_password = prompt_new_password(NEW_PASSWORD_ENV)?;

    // 3. Verify and replace in one step.
    let result = gate.change_password(
        old_password.as_bytes(),
        new_password.as_bytes(),
        settings.kdf_iterations,
        Utc::now(),
        &mut rand::rng(),
    );
    if let Err(VaultError::WrongCurrentPassword) = &result {
        if let Some(secs) = record_failed_attempt(&vault_dir, &gate) {
            output::warning(&format!("Too many failed attempts: vault locked for {secs}s"));
        }
    }
    let _new_key = result?;

    audit(
        &vault_dir,
        "change-password",
        None,
        Some(&format!("{item_count} item(s) left under the old key")),
    );
    output::success("Vault password changed");

    Ok(())
}
