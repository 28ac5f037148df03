//! Rule domain model.

use super::matcher::{Pattern, normalize};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw, unvalidated rule fields as they appear in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Keywords; `*` and `?` turn a keyword into an anchored glob.
    pub keywords: Vec<String>,
    /// Reply template, supports `{key}` placeholders.
    #[serde(alias = "reply_text")]
    pub reply_template: String,
    #[serde(default)]
    pub fixed_delay: f64,
    #[serde(default)]
    pub random_delay_max: f64,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl RuleConfig {
    /// Creates a config with default flags and no delay.
    pub fn new(keywords: &[&str], reply_template: impl Into<String>) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            reply_template: reply_template.into(),
            fixed_delay: 0.0,
            random_delay_max: 0.0,
            case_sensitive: false,
            enabled: true,
            priority: 0,
            description: None,
        }
    }

    pub fn with_delay(mut self, fixed_delay: f64, random_delay_max: f64) -> Self {
        self.fixed_delay = fixed_delay;
        self.random_delay_max = random_delay_max;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A validated auto-reply rule.
///
/// Rules are immutable once built. Changing any field means building a new
/// rule, e.g. via [`Rule::with_enabled`].
#[derive(Debug, Clone)]
pub struct Rule {
    patterns: Vec<Pattern>,
    reply_template: String,
    fixed_delay: f64,
    random_delay_max: f64,
    case_sensitive: bool,
    enabled: bool,
    priority: i32,
    description: Option<String>,
}

impl Rule {
    /// Validates `config` and compiles its keywords.
    ///
    /// `context` names the rule in error messages (e.g. `account 'a' rule[2]`).
    pub fn from_config(config: RuleConfig, context: &str) -> Result<Self, ConfigError> {
        if config.keywords.is_empty() {
            return Err(ConfigError::EmptyKeywords {
                context: context.to_string(),
            });
        }

        let mut patterns = Vec::with_capacity(config.keywords.len());
        for keyword in &config.keywords {
            let keyword = keyword.trim();
            if keyword.is_empty() {
                return Err(ConfigError::EmptyKeyword {
                    context: context.to_string(),
                });
            }
            // message text loses these characters before matching
            if normalize(keyword).trim().is_empty() {
                return Err(ConfigError::UnmatchableKeyword {
                    context: context.to_string(),
                    keyword: keyword.to_string(),
                });
            }
            let pattern = Pattern::compile(keyword, config.case_sensitive).map_err(|e| {
                ConfigError::InvalidPattern {
                    context: context.to_string(),
                    pattern: keyword.to_string(),
                    message: e.to_string(),
                }
            })?;
            patterns.push(pattern);
        }

        let reply_template = config.reply_template.trim();
        if reply_template.is_empty() {
            return Err(ConfigError::EmptyTemplate {
                context: context.to_string(),
            });
        }

        for (field, value) in [
            ("fixed_delay", config.fixed_delay),
            ("random_delay_max", config.random_delay_max),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeDelay {
                    context: context.to_string(),
                    field,
                    value,
                });
            }
        }
        let longest = config.fixed_delay + config.random_delay_max;
        if Duration::try_from_secs_f64(longest).is_err() {
            return Err(ConfigError::DurationOutOfRange {
                context: context.to_string(),
                field: "fixed_delay + random_delay_max",
                value: longest,
            });
        }

        Ok(Self {
            patterns,
            reply_template: reply_template.to_string(),
            fixed_delay: config.fixed_delay,
            random_delay_max: config.random_delay_max,
            case_sensitive: config.case_sensitive,
            enabled: config.enabled,
            priority: config.priority,
            description: config.description,
        })
    }

    /// Shorthand for [`Rule::from_config`] with a generic context.
    pub fn new(config: RuleConfig) -> Result<Self, ConfigError> {
        Self::from_config(config, "rule")
    }

    /// Returns a copy of this rule with `enabled` replaced.
    pub fn with_enabled(&self, enabled: bool) -> Self {
        Self {
            enabled,
            ..self.clone()
        }
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Keywords as written (trimmed).
    pub fn keywords(&self) -> Vec<&str> {
        self.patterns.iter().map(Pattern::as_str).collect()
    }

    pub fn reply_template(&self) -> &str {
        &self.reply_template
    }

    pub fn fixed_delay(&self) -> f64 {
        self.fixed_delay
    }

    pub fn random_delay_max(&self) -> f64 {
        self.random_delay_max
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// `(fixed_delay, fixed_delay + random_delay_max)`
    pub fn total_delay_range(&self) -> (f64, f64) {
        (self.fixed_delay, self.fixed_delay + self.random_delay_max)
    }
}
