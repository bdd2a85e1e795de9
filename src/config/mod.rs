//! Configuration — optional per-vault `securevault.toml`.

pub mod settings;

pub use settings::Settings;
