//! Error types for replyflow.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// A `ConfigError` is fatal for the startup of the configuration (or the
/// single account) it describes. Other accounts are never affected.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Failed to write config file.
    #[error("failed to write config file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unsupported config version '{0}' (expected 1.x or 1.x.y)")]
    UnsupportedVersion(String),

    #[error("{context}: keyword list must not be empty")]
    EmptyKeywords { context: String },

    #[error("{context}: keywords must be non-empty strings")]
    EmptyKeyword { context: String },

    #[error("{context}: reply template must not be empty")]
    EmptyTemplate { context: String },

    #[error("{context}: {field} must be a non-negative number, got {value}")]
    NegativeDelay {
        context: String,
        field: &'static str,
        value: f64,
    },

    #[error("{context}: {field} of {value} seconds is too large")]
    DurationOutOfRange {
        context: String,
        field: &'static str,
        value: f64,
    },

    #[error("{context}: keyword '{keyword}' consists only of emoji and can never match")]
    UnmatchableKeyword { context: String, keyword: String },

    #[error("{context}: invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        context: String,
        pattern: String,
        message: String,
    },

    #[error("{context}: {field} must be greater than zero")]
    NotPositive {
        context: String,
        field: &'static str,
    },

    #[error("account name must not be empty")]
    EmptyAccountName,

    #[error("account name '{0}' exceeds 50 characters")]
    AccountNameTooLong(String),

    #[error("duplicate account name '{0}'")]
    DuplicateAccount(String),

    #[error("account '{0}' must monitor at least one target")]
    NoTargets(String),

    #[error("account '{0}': monitor targets must be non-empty strings")]
    EmptyTarget(String),

    #[error("at least one account must be configured")]
    NoAccounts,

    #[error("default account '{0}' is not in the account list")]
    UnknownDefaultAccount(String),

    #[error("unknown account '{0}'")]
    UnknownAccount(String),

    #[error("invalid log level '{0}' (expected DEBUG, INFO, WARNING or ERROR)")]
    InvalidLogLevel(String),
}

impl ConfigError {
    /// Creates a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse TOML error.
    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    /// Creates a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFile {
            path: path.into(),
            source,
        }
    }
}

/// Failure of a call into an external automation collaborator.
///
/// All variants are transient from the session's point of view: they are
/// retried and, once retries are exhausted, counted against the session's
/// consecutive error budget.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutomationError {
    #[error("operation '{operation}' timed out")]
    Timeout { operation: String },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("navigation to '{target}' failed: {message}")]
    Navigation { target: String, message: String },

    /// The collaborator answered but refused the action (returned `false`).
    #[error("operation '{operation}' was rejected for target '{target}'")]
    Rejected { operation: String, target: String },

    #[error("automation driver error: {0}")]
    Driver(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl AutomationError {
    pub fn rejected(operation: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            target: target.into(),
        }
    }

    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }
}

impl From<std::io::Error> for AutomationError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(format!("{} (kind: {:?})", err, err.kind()))
    }
}

/// A shared error type for the entire replyflow workspace.
#[derive(Error, Debug)]
pub enum ReplyflowError {
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// External automation collaborator failure
    #[error(transparent)]
    Automation(#[from] AutomationError),

    /// The automation context for an account could not be established
    #[error("failed to initialize account '{account}': {message}")]
    InitFailure { account: String, message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Shared storage error (lock or persistence)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ReplyflowError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn init_failure(account: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InitFailure {
            account: account.into(),
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ReplyflowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ReplyflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ReplyflowError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ReplyflowError>`.
pub type Result<T> = std::result::Result<T, ReplyflowError>;
