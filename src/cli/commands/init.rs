//! `securevault init` — create the vault directory and its credential.

use crate::auth::AuthGate;
use crate::cli::output;
use crate::cli::{audit, prompt_new_password, resolve_vault_dir, Cli, PASSWORD_ENV};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::VaultStore;

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let vault_dir = resolve_vault_dir(cli)?;

    // 1. Refuse to overwrite an existing credential.
    if AuthGate::is_initialized(&vault_dir) {
        output::tip("Use `securevault add <FILE>` to store files in the existing vault.");
        return Err(VaultError::VaultAlreadyInitialized(vault_dir));
    }

    // 2. Create the private directory (owner-only on Unix).
    let existed = vault_dir.exists();
    VaultStore::create_dir(&vault_dir)?;
    if !existed {
        output::info(&format!("Created vault directory: {}", vault_dir.display()));
    }

    // 3. Choose the password and write the credential.
    let settings = Settings::load(&vault_dir)?;
    let password = prompt_new_password(PASSWORD_ENV)?;
    AuthGate::initialize(
        &vault_dir,
        password.as_bytes(),
        settings.kdf_iterations,
        settings.lockout_policy(),
        &mut rand::rng(),
    )?;

    audit(&vault_dir, "init", None, Some("vault created"));
    output::success(&format!("Vault created at {}", vault_dir.display()));

    output::tip("Run `securevault add <FILE>` to encrypt a file.");
    output::tip("Run `securevault list` to see stored items.");

    Ok(())
}
