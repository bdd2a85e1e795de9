//! `securevault delete` — securely erase an item from the vault.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{audit, resolve_vault_dir, unlock, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::VaultStore;

/// Execute the `delete` command.
pub fn execute(cli: &Cli, item: &str, force: bool) -> Result<()> {
    // Unless --force is set, ask for confirmation before erasing.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Securely erase vault item '{item}'? This cannot be undone"))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let vault_dir = resolve_vault_dir(cli)?;
    let settings = Settings::load(&vault_dir)?;
    let (_gate, _key) = unlock(&vault_dir, &settings)?;

    let store = VaultStore::open(&vault_dir)?.with_wipe_passes(settings.wipe_passes);
    store.delete(item, &mut rand::rng())?;

    audit(&vault_dir, "delete", Some(item), None);
    output::success(&format!("Erased vault item '{item}'"));

    Ok(())
}
