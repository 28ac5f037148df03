//! Loading and saving the TOML configuration file.

use crate::storage::{StorageError, write_atomic};
use replyflow_core::ConfigError;
use replyflow_core::config::AppConfig;
use std::fs;
use std::path::Path;

/// Parses a configuration document without validating it.
pub fn parse_config(path: &Path, content: &str) -> Result<AppConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Reads, parses and validates the root of a configuration file.
///
/// Per-account problems are left to
/// [`AppConfig::all_account_settings`](replyflow_core::config::AppConfig::all_account_settings)
/// so one broken account does not keep the others from starting.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let config = parse_config(path, &content)?;
    config.validate()?;
    tracing::debug!(path = %path.display(), accounts = config.accounts.len(), "configuration loaded");
    Ok(config)
}

/// Writes `config` as pretty TOML, atomically.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(config)?;
    write_atomic(path, text.as_bytes()).map_err(|e| match e {
        StorageError::Io(source) => ConfigError::write_file(path, source),
        other => ConfigError::write_file(path, std::io::Error::other(other.to_string())),
    })?;
    tracing::debug!(path = %path.display(), "configuration saved");
    Ok(())
}

/// Writes the example configuration. Refuses to overwrite unless `force`.
pub fn write_example_config(path: &Path, force: bool) -> Result<AppConfig, ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::write_file(
            path,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "file exists (use --force to overwrite)",
            ),
        ));
    }
    let example = AppConfig::example();
    save_config(path, &example)?;
    Ok(example)
}
