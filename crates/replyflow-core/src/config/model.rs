//! Configuration file schema.
//!
//! Every struct rejects unknown fields so typos fail at load time instead of
//! silently changing matching behavior.

use crate::rule::RuleConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Version written by [`AppConfig::example`].
pub const CURRENT_CONFIG_VERSION: &str = "1.0";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Account started by `run` when no account is selected explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_account: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Rules used by accounts that define none of their own.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_rules: Vec<RuleConfig>,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

fn default_version() -> String {
    CURRENT_CONFIG_VERSION.to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// DEBUG, INFO, WARNING or ERROR
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write logs to this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// The level as a `tracing` filter directive.
    pub fn filter_directive(&self) -> &'static str {
        match self.level.to_ascii_uppercase().as_str() {
            "DEBUG" => "debug",
            "WARNING" | "WARN" => "warn",
            "ERROR" => "error",
            _ => "info",
        }
    }
}

/// Session timing and failure budget. Accounts may override some fields.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Seconds between ticks.
    #[serde(default = "default_check_interval")]
    pub check_interval: f64,
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
    /// Attempts per collaborator call before it counts as a failure.
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,
    /// Seconds between attempts.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: f64,
    /// Degraded mode waits `check_interval * degraded_interval_factor`.
    #[serde(default = "default_degraded_interval_factor")]
    pub degraded_interval_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    /// Seconds between status log lines while running.
    #[serde(default = "default_status_interval")]
    pub status_interval: f64,
}

fn default_check_interval() -> f64 {
    2.0
}

fn default_max_consecutive_errors() -> u32 {
    5
}

fn default_max_retry_count() -> u32 {
    3
}

fn default_retry_delay() -> f64 {
    2.0
}

fn default_degraded_interval_factor() -> f64 {
    3.0
}

fn default_status_interval() -> f64 {
    60.0
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
            max_consecutive_errors: default_max_consecutive_errors(),
            max_retry_count: default_max_retry_count(),
            retry_delay: default_retry_delay(),
            degraded_interval_factor: default_degraded_interval_factor(),
            random_seed: None,
            status_interval: default_status_interval(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Shared contact remark document (JSON).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contacts_file: Option<PathBuf>,
    /// Root directory of the file mailbox driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailbox_dir: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    pub name: String,
    #[serde(default, alias = "monitor_chats")]
    pub monitor_targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_interval: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_consecutive_errors: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleConfig>,
}

impl AccountConfig {
    pub fn new(name: impl Into<String>, monitor_targets: &[&str]) -> Self {
        Self {
            name: name.into(),
            monitor_targets: monitor_targets.iter().map(|t| t.to_string()).collect(),
            check_interval: None,
            max_consecutive_errors: None,
            random_seed: None,
            rules: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<RuleConfig>) -> Self {
        self.rules = rules;
        self
    }
}

impl AppConfig {
    /// A small, valid configuration used by `init-config`.
    pub fn example() -> Self {
        Self {
            version: default_version(),
            description: Some("replyflow example configuration".to_string()),
            default_account: Some("test_account".to_string()),
            logging: LoggingConfig::default(),
            runtime: RuntimeConfig::default(),
            storage: StorageConfig::default(),
            global_rules: Vec::new(),
            accounts: vec![AccountConfig::new("test_account", &["target_user"]).with_rules(vec![
                RuleConfig::new(&["hello", "hi"], "Hello {sender_name}! How are you?")
                    .with_delay(2.0, 3.0)
                    .with_description("greeting"),
                RuleConfig::new(&["*meeting*"], "I'll join the meeting soon.")
                    .with_delay(1.0, 2.0)
                    .with_priority(5)
                    .with_description("meeting notice"),
            ])],
        }
    }

    pub fn account(&self, name: &str) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| a.name.trim() == name)
    }

    /// Account rules, or the global rules when the account has none.
    pub fn effective_rules<'a>(&'a self, account: &'a AccountConfig) -> &'a [RuleConfig] {
        if account.rules.is_empty() {
            &self.global_rules
        } else {
            &account.rules
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [[accounts]]
            name = "a"
            monitor_targets = ["bob"]
            "#,
        )
        .unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.runtime, RuntimeConfig::default());
        assert_eq!(config.logging.filter_directive(), "info");
        assert_eq!(config.accounts[0].monitor_targets, vec!["bob"]);
    }

    #[test]
    fn test_monitor_chats_alias() {
        let config: AppConfig = toml::from_str(
            r#"
            [[accounts]]
            name = "a"
            monitor_chats = ["bob"]
            "#,
        )
        .unwrap();
        assert_eq!(config.accounts[0].monitor_targets, vec!["bob"]);
    }

    #[test]
    fn test_unknown_root_field_rejected() {
        let parsed: Result<AppConfig, _> = toml::from_str("colour = \"blue\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_global_rules_fallback() {
        let mut config = AppConfig::example();
        config.global_rules = vec![RuleConfig::new(&["x"], "global")];
        let mut bare = AccountConfig::new("bare", &["t"]);
        assert_eq!(config.effective_rules(&bare)[0].reply_template, "global");
        bare.rules = vec![RuleConfig::new(&["y"], "own")];
        assert_eq!(config.effective_rules(&bare)[0].reply_template, "own");
    }

    #[test]
    fn test_example_survives_toml_roundtrip() {
        let example = AppConfig::example();
        let text = toml::to_string_pretty(&example).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, example);
    }
}
