//! `securevault wipe` — overwrite any file with random data, then unlink it.

use std::path::Path;

use dialoguer::Confirm;

use crate::auth::AuthGate;
use crate::cli::output;
use crate::cli::{audit, resolve_vault_dir, Cli};
use crate::config::Settings;
use crate::eraser;
use crate::errors::{Result, VaultError};

/// Execute the `wipe` command.
pub fn execute(cli: &Cli, file: &Path, force: bool) -> Result<()> {
    let display = file.display().to_string();

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Securely erase '{display}'? This cannot be undone"))
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

    eraser::wipe(file, settings.wipe_passes, &mut rand::rng())?;

    if AuthGate::is_initialized(&vault_dir) {
        audit(&vault_dir, "wipe", None, Some(&display));
    }
    output::success(&format!(
        "Erased '{display}' ({} pass(es))",
        settings.wipe_passes
    ));
    output::tip("Copy-on-write filesystems, SSDs and snapshots may still hold old blocks.");

    Ok(())
}
