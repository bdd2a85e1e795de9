//! `securevault extract` — decrypt an item back to a regular file.

use std::path::Path;

use crate::cli::output;
use crate::cli::{audit, resolve_vault_dir, unlock, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::vault::VaultStore;

/// Execute the `extract` command.
pub fn execute(cli: &Cli, item: &str, out_dir: Option<&Path>) -> Result<()> {
    let vault_dir = resolve_vault_dir(cli)?;
    let settings = Settings::load(&vault_dir)?;
    let (_gate, key) = unlock(&vault_dir, &settings)?;

    let out_dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };

    let store = VaultStore::open(&vault_dir)?;
    let written = store.extract(&key, item, &out_dir, &mut rand::rng())?;

    let written_display = written.display().to_string();
    audit(&vault_dir, "extract", Some(item), Some(&written_display));
    output::success(&format!("Extracted {item} to {written_display}"));

    Ok(())
}
