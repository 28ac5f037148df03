//! Contact remark domain model.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Display metadata for one monitored target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRemark {
    pub target_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

impl ContactRemark {
    /// The name a reply should address: the remark if set, else the
    /// display name.
    pub fn preferred_name(&self) -> &str {
        match self.remark.as_deref() {
            Some(remark) if !remark.trim().is_empty() => remark,
            _ => &self.display_name,
        }
    }
}

/// Shared mapping of target ids to display metadata.
///
/// A single document is shared by every running session, so each call must
/// observe the latest persisted state and persist its change immediately.
#[async_trait]
pub trait ContactRemarkStore: Send + Sync {
    async fn get(&self, target_id: &str) -> Result<Option<ContactRemark>>;

    /// Creates or updates a contact. `remark = None` keeps an existing remark.
    async fn set(
        &self,
        target_id: &str,
        display_name: &str,
        remark: Option<&str>,
    ) -> Result<ContactRemark>;

    async fn list(&self) -> Result<Vec<ContactRemark>>;
}
