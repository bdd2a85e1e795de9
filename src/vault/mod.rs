//! Vault module — encrypted item storage.
//!
//! This module provides:
//! - The streaming `.sv` item format (`format`)
//! - `ItemSummary` / `ItemListing` types for vault listings (`item`)
//! - High-level `VaultStore` for adding, listing, extracting and deleting items (`store`)

pub mod format;
pub mod item;
pub mod store;

// Re-export the most commonly used items.
pub use format::ItemHeader;
pub use item::{ItemListing, ItemSummary};
pub use store::VaultStore;
