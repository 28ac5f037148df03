pub mod automation;
pub mod config;
pub mod contact;
pub mod error;
pub mod rule;

// Re-export common error types
pub use error::{AutomationError, ConfigError, ReplyflowError, Result};
