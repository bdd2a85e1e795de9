//! `securevault list` — display all vault items in a table.

use serde_json::json;

use crate::cli::output;
use crate::cli::{resolve_vault_dir, unlock, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::{ItemListing, VaultStore};

/// Execute the `list` command.
pub fn execute(cli: &Cli, as_json: bool) -> Result<()> {
    let vault_dir = resolve_vault_dir(cli)?;
    let settings = Settings::load(&vault_dir)?;
    let (_gate, _key) = unlock(&vault_dir, &settings)?;

    let store = VaultStore::open(&vault_dir)?;
    let items = store.list_items()?;

    if as_json {
        let rendered = serde_json::to_string_pretty(&listing_json(&items))
            .map_err(|e| VaultError::SerializationError(e.to_string()))?;
        println!("{rendered}");
        return Ok(());
    }

    let unreadable: Vec<&str> = items
        .iter()
        .filter(|i| !i.is_valid())
        .map(ItemListing::file_name)
        .collect();
    output::info(&format!("{} item(s) in {}", items.len(), vault_dir.display()));
    output::print_items_table(&items);
    if !unreadable.is_empty() {
        output::warning(&format!(
            "{} item(s) could not be read: {}",
            unreadable.len(),
            unreadable.join(", ")
        ));
    }

    Ok(())
}

fn listing_json(items: &[ItemListing]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = items
        .iter()
        .map(|listing| match listing {
            ItemListing::Valid(summary) => json!(summary),
            ItemListing::Invalid { file_name, error } => json!({
                "file_name": file_name,
                "error": error.to_string(),
            }),
        })
        .collect();
    serde_json::Value::Array(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::ItemSummary;
    use chrono::{TimeZone, Utc};

    #[test]
    fn json_includes_valid_and_invalid_items() {
        let items = vec![
            ItemListing::Valid(ItemSummary {
                file_name: "a.txt_1.sv".into(),
                original_name: "a.txt".into(),
                original_size: 3,
                modified: Utc.timestamp_opt(0, 0).unwrap(),
            }),
            ItemListing::Invalid {
                file_name: "junk_2.sv".into(),
                error: VaultError::BadMagic,
            },
        ];

        let value = listing_json(&items);
        assert_eq!(value[0]["original_name"], "a.txt");
        assert_eq!(value[0]["original_size"], 3);
        assert_eq!(value[1]["file_name"], "junk_2.sv");
        assert!(value[1]["error"].as_str().unwrap().contains("magic"));
    }
}
