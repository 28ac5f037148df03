//! Collaborator contracts consumed by sessions.
//!
//! Implementations (browser drivers, window followers, the file mailbox
//! driver) live outside the core. A session holds shared references to its
//! collaborators and never calls two of them concurrently.

use crate::error::AutomationError;
use async_trait::async_trait;

pub type AutomationResult<T> = std::result::Result<T, AutomationError>;

/// Reads inbound text for monitored targets.
#[async_trait]
pub trait Monitor: Send + Sync {
    /// True if the target received text since the last check.
    async fn has_new_text(&self, target: &str) -> AutomationResult<bool>;

    /// The most recent inbound text of the target, if any.
    async fn latest_text(&self, target: &str) -> AutomationResult<Option<String>>;
}

/// Acts on monitored targets.
///
/// `Ok(false)` means the collaborator ran but the action did not take effect;
/// callers treat it like a transient failure.
#[async_trait]
pub trait Actions: Send + Sync {
    async fn mark_read(&self, target: &str) -> AutomationResult<bool>;

    async fn send(&self, target: &str, text: &str) -> AutomationResult<bool>;
}

/// Lifecycle of the automation context backing one account.
#[async_trait]
pub trait AutomationContext: Send + Sync {
    /// Establishes the context (launch, log in, open the page...).
    async fn initialize(&self) -> AutomationResult<()>;

    /// Releases everything `initialize` acquired.
    async fn release(&self) -> AutomationResult<()>;
}
