//! `securevault add` — encrypt a file into the vault.

use std::path::Path;

use chrono::Utc;

use crate::cli::output;
use crate::cli::{audit, resolve_vault_dir, unlock, Cli};
use crate::config::Settings;
use crate::eraser;
use crate::errors::Result;
use crate::vault::VaultStore;

/// Execute the `add` command.
pub fn execute(cli: &Cli, file: &Path, wipe_original: bool) -> Result<()> {
    let vault_dir = resolve_vault_dir(cli)?;
    let settings = Settings::load(&vault_dir)?;
    let (_gate, key) = unlock(&vault_dir, &settings)?;

    let store = VaultStore::open(&vault_dir)?.with_wipe_passes(settings.wipe_passes);
    let mut rng = rand::rng();

    let item = store.add_file(&key, file, Utc::now(), &mut rng)?;
    let source = file.display().to_string();
    audit(&vault_dir, "add", Some(&item), Some(&source));
    output::success(&format!("Stored '{source}' as {item}"));

    if wipe_original {
        eraser::wipe(file, settings.wipe_passes, &mut rng)?;
        audit(&vault_dir, "wipe", None, Some(&source));
        output::success(&format!(
            "Original '{source}' erased ({} pass(es))",
            settings.wipe_passes
        ));
    } else {
        output::tip("The original file is untouched. Use `securevault wipe` to erase it.");
    }

    Ok(())
}
