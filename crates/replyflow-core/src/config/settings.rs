//! Validated configuration.
//!
//! Root-level problems (version, duplicate names, bad runtime values) reject
//! the whole document. Problems inside one account only reject that account.

use super::model::{AccountConfig, AppConfig, RuntimeConfig};
use crate::error::ConfigError;
use crate::rule::Rule;
use std::collections::HashSet;
use std::time::Duration;

const MAX_ACCOUNT_NAME_LEN: usize = 50;
const SUPPORTED_MAJOR_VERSION: u32 = 1;
const LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "WARN", "ERROR"];

/// Timing and failure budget of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub check_interval: Duration,
    pub max_consecutive_errors: u32,
    pub max_retry_count: u32,
    pub retry_delay: Duration,
    pub degraded_interval_factor: f64,
    pub random_seed: Option<u64>,
}

impl SessionSettings {
    /// How long degraded mode waits before reinitializing. Saturates at
    /// [`Duration::MAX`].
    pub fn degraded_interval(&self) -> Duration {
        scaled(self.check_interval, self.degraded_interval_factor).unwrap_or(Duration::MAX)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(2),
            max_consecutive_errors: 5,
            max_retry_count: 3,
            retry_delay: Duration::from_secs(2),
            degraded_interval_factor: 3.0,
            random_seed: None,
        }
    }
}

/// Everything needed to start one account's session.
#[derive(Debug, Clone)]
pub struct AccountSettings {
    pub name: String,
    pub monitor_targets: Vec<String>,
    pub rules: Vec<Rule>,
    pub session: SessionSettings,
}

fn scaled(duration: Duration, factor: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(duration.as_secs_f64() * factor).ok()
}

fn secs(context: &str, field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::DurationOutOfRange {
        context: context.to_string(),
        field,
        value,
    })
}

fn positive_secs(context: &str, field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::NotPositive {
            context: context.to_string(),
            field,
        });
    }
    secs(context, field, value)
}

fn validate_version(version: &str) -> Result<(), ConfigError> {
    let unsupported = || ConfigError::UnsupportedVersion(version.to_string());
    let parts: Vec<&str> = version.trim().split('.').collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(unsupported());
    }
    let numbers = parts
        .iter()
        .map(|p| p.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| unsupported())?;
    if numbers[0] != SUPPORTED_MAJOR_VERSION {
        return Err(unsupported());
    }
    Ok(())
}

fn validate_runtime(runtime: &RuntimeConfig) -> Result<(), ConfigError> {
    let context = "runtime";
    positive_secs(context, "check_interval", runtime.check_interval)?;
    if !runtime.retry_delay.is_finite() || runtime.retry_delay < 0.0 {
        return Err(ConfigError::NegativeDelay {
            context: context.to_string(),
            field: "retry_delay",
            value: runtime.retry_delay,
        });
    }
    secs(context, "retry_delay", runtime.retry_delay)?;
    positive_secs(context, "status_interval", runtime.status_interval)?;
    if runtime.max_consecutive_errors == 0 {
        return Err(ConfigError::NotPositive {
            context: context.to_string(),
            field: "max_consecutive_errors",
        });
    }
    if runtime.max_retry_count == 0 {
        return Err(ConfigError::NotPositive {
            context: context.to_string(),
            field: "max_retry_count",
        });
    }
    if !runtime.degraded_interval_factor.is_finite() || runtime.degraded_interval_factor <= 0.0 {
        return Err(ConfigError::NotPositive {
            context: context.to_string(),
            field: "degraded_interval_factor",
        });
    }
    Ok(())
}

impl AppConfig {
    /// Checks everything that is not specific to a single account.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_version(&self.version)?;

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_uppercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }

        validate_runtime(&self.runtime)?;

        if self.accounts.is_empty() {
            return Err(ConfigError::NoAccounts);
        }

        let mut names = HashSet::new();
        for account in &self.accounts {
            let name = account.name.trim();
            if name.is_empty() {
                return Err(ConfigError::EmptyAccountName);
            }
            if name.chars().count() > MAX_ACCOUNT_NAME_LEN {
                return Err(ConfigError::AccountNameTooLong(name.to_string()));
            }
            if !names.insert(name) {
                return Err(ConfigError::DuplicateAccount(name.to_string()));
            }
        }

        if let Some(default) = &self.default_account
            && !names.contains(default.trim())
        {
            return Err(ConfigError::UnknownDefaultAccount(default.clone()));
        }

        Ok(())
    }

    /// Validates one account, applying runtime defaults and global rules.
    pub fn account_settings(&self, account: &AccountConfig) -> Result<AccountSettings, ConfigError> {
        let name = account.name.trim().to_string();
        if name.is_empty() {
            return Err(ConfigError::EmptyAccountName);
        }

        if account.monitor_targets.is_empty() {
            return Err(ConfigError::NoTargets(name));
        }
        let mut monitor_targets = Vec::with_capacity(account.monitor_targets.len());
        for target in &account.monitor_targets {
            let target = target.trim();
            if target.is_empty() {
                return Err(ConfigError::EmptyTarget(name));
            }
            monitor_targets.push(target.to_string());
        }

        let rules = self
            .effective_rules(account)
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                Rule::from_config(rule.clone(), &format!("account '{name}' rule[{i}]"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let context = format!("account '{name}'");
        let check_interval = positive_secs(
            &context,
            "check_interval",
            account.check_interval.unwrap_or(self.runtime.check_interval),
        )?;
        let max_consecutive_errors = account
            .max_consecutive_errors
            .unwrap_or(self.runtime.max_consecutive_errors);
        if max_consecutive_errors == 0 {
            return Err(ConfigError::NotPositive {
                context,
                field: "max_consecutive_errors",
            });
        }
        let factor = self.runtime.degraded_interval_factor;
        if scaled(check_interval, factor).is_none() {
            return Err(ConfigError::DurationOutOfRange {
                context,
                field: "check_interval * degraded_interval_factor",
                value: check_interval.as_secs_f64() * factor,
            });
        }
        let retry_delay = secs(&context, "retry_delay", self.runtime.retry_delay)?;

        Ok(AccountSettings {
            name,
            monitor_targets,
            rules,
            session: SessionSettings {
                check_interval,
                max_consecutive_errors,
                max_retry_count: self.runtime.max_retry_count,
                retry_delay,
                degraded_interval_factor: factor,
                random_seed: account.random_seed.or(self.runtime.random_seed),
            },
        })
    }

    /// Validates every account independently, in configured order.
    pub fn all_account_settings(&self) -> Vec<(String, Result<AccountSettings, ConfigError>)> {
        self.accounts
            .iter()
            .map(|account| (account.name.trim().to_string(), self.account_settings(account)))
            .collect()
    }

    /// Accounts selected for a run: `only` if given, else every account.
    pub fn selected_accounts(&self, only: Option<&str>) -> Result<Vec<&AccountConfig>, ConfigError> {
        match only {
            Some(name) => self
                .account(name.trim())
                .map(|a| vec![a])
                .ok_or_else(|| ConfigError::UnknownAccount(name.to_string())),
            None => Ok(self.accounts.iter().collect()),
        }
    }

    /// The account a single-account command falls back to.
    pub fn resolve_account(&self, name: Option<&str>) -> Result<&AccountConfig, ConfigError> {
        let name = match name.or(self.default_account.as_deref()) {
            Some(name) => name,
            None => return self.accounts.first().ok_or(ConfigError::NoAccounts),
        };
        self.account(name.trim())
            .ok_or_else(|| ConfigError::UnknownAccount(name.to_string()))
    }
}
