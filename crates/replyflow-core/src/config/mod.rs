//! Configuration schema and validation.
//!
//! `model` mirrors the TOML document; `settings` turns it into the validated
//! values sessions run with.

mod model;
mod settings;

pub use model::{
    AccountConfig, AppConfig, CURRENT_CONFIG_VERSION, LoggingConfig, RuntimeConfig, StorageConfig,
};
pub use settings::{AccountSettings, SessionSettings};
