//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::ItemListing;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of vault items (Item, Original name, Size, Modified).
///
/// Items whose header could not be read are shown with the error in red.
pub fn print_items_table(items: &[ItemListing]) {
    if items.is_empty() {
        info("No items in this vault yet.");
        tip("Run `securevault add <FILE>` to encrypt your first file.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Item", "Original name", "Size", "Modified"]);

    for listing in items {
        match listing {
            ItemListing::Valid(s) => table.add_row(vec![
                s.file_name.clone(),
                s.original_name.clone(),
                format_size(s.original_size),
                s.modified.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]),
            ItemListing::Invalid { file_name, error } => table.add_row(vec![
                file_name.clone(),
                style(format!("unreadable: {error}")).red().to_string(),
                "-".to_string(),
                "-".to_string(),
            ]),
        };
    }

    println!("{table}");
}

/// Human-readable byte count using binary units.
#[allow(clippy::cast_precision_loss)] // Display only; one decimal place is shown
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_small_values_are_exact() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn format_size_uses_binary_units() {
        assert_eq!(format_size(1024), "1.0 KiB");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
