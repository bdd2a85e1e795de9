//! Listing types for vault items.
//!
//! Listing only reads item headers (nothing is decrypted), so a summary
//! carries just the metadata the header exposes plus the file's mtime.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::VaultError;

/// Lightweight metadata about a vault item (no ciphertext).
#[derive(Debug, Clone, Serialize)]
pub struct ItemSummary {
    /// Name of the `.sv` file inside the vault directory.
    pub file_name: String,

    /// Filename of the plaintext when it was added.
    pub original_name: String,

    /// Plaintext length in bytes.
    pub original_size: u64,

    /// Last modification time of the item file.
    pub modified: DateTime<Utc>,
}

/// One row of a vault listing.
///
/// A corrupt or foreign `.sv` file shows up as `Invalid` instead of
/// aborting the whole listing.
#[derive(Debug)]
pub enum ItemListing {
    Valid(ItemSummary),
    Invalid { file_name: String, error: VaultError },
}

impl ItemListing {
    /// Name of the `.sv` file this row describes.
    pub fn file_name(&self) -> &str {
        match self {
            Self::Valid(summary) => &summary.file_name,
            Self::Invalid { file_name, .. } => file_name,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}
