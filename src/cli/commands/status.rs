//! `securevault status` — show where the vault lives and whether it is locked.
//!
//! Reads only the credential record and item headers; no password needed.

use chrono::Utc;
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::auth::{AuthGate, LockState};
use crate::cli::output;
use crate::cli::{resolve_vault_dir, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::vault::VaultStore;

/// Execute the `status` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let vault_dir = resolve_vault_dir(cli)?;

    if !AuthGate::is_initialized(&vault_dir) {
        output::info(&format!("No vault at {}", vault_dir.display()));
        output::tip("Run `securevault init` to create one.");
        return Ok(());
    }

    let settings = Settings::load(&vault_dir)?;
    let gate = AuthGate::load(&vault_dir, settings.lockout_policy())?;
    let credential = gate.credential();
    let items = VaultStore::open(&vault_dir)?.list_items()?;
    let unreadable = items.iter().filter(|i| !i.is_valid()).count();

    let lock = match gate.check_lockout(Utc::now()) {
        LockState::Open => style("open").green().to_string(),
        LockState::Locked { remaining_secs } => style(format!("locked ({remaining_secs}s left)"))
            .red()
            .bold()
            .to_string(),
    };

    let config_file = Settings::path_in(&vault_dir);
    let config = if config_file.exists() {
        config_file.display().to_string()
    } else {
        "(defaults)".to_string()
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Vault directory".to_string(), vault_dir.display().to_string()]);
    table.add_row(vec!["State".to_string(), lock]);
    table.add_row(vec![
        "Failed attempts".to_string(),
        format!(
            "{} of {}",
            credential.failed_attempts, settings.max_failed_attempts
        ),
    ]);
    table.add_row(vec![
        "Items".to_string(),
        format!("{} ({unreadable} unreadable)", items.len()),
    ]);
    table.add_row(vec![
        "KDF".to_string(),
        format!("PBKDF2-HMAC-SHA256, {} iterations", credential.iterations),
    ]);
    table.add_row(vec!["Settings".to_string(), config]);
    table.add_row(vec![
        "Audit log".to_string(),
        if cfg!(feature = "audit-log") {
            "enabled".to_string()
        } else {
            "not compiled in".to_string()
        },
    ]);

    println!("{table}");

    if credential.iterations < settings.kdf_iterations {
        output::tip(&format!(
            "Stored hash uses fewer iterations than configured ({}); \
             `securevault change-password` re-hashes at the new count.",
            settings.kdf_iterations
        ));
    }

    Ok(())
}
