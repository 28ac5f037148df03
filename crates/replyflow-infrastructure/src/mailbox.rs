//! File-based automation driver.
//!
//! Each account owns `<root>/<account>/`. For a target `t`:
//!
//! - `t.inbox`  inbound text, one message per line (appended by anyone)
//! - `t.read`   line count of the inbox when it was last marked read; lines
//!   past it are unread
//! - `t.outbox` sent replies, `<rfc3339>\t<text>` per line
//!
//! The driver lets sessions run end to end without a browser and makes
//! their behavior observable from the shell.

use async_trait::async_trait;
use replyflow_core::AutomationError;
use replyflow_core::automation::{Actions, AutomationContext, AutomationResult, Monitor};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub struct FileMailbox {
    account_dir: PathBuf,
    initialized: AtomicBool,
}

impl FileMailbox {
    pub fn new(root: impl AsRef<Path>, account: &str) -> Self {
        Self {
            account_dir: root.as_ref().join(account),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn account_dir(&self) -> &Path {
        &self.account_dir
    }

    fn file(&self, target: &str, extension: &str) -> AutomationResult<PathBuf> {
        let valid = !target.is_empty()
            && target != "."
            && target != ".."
            && !target.contains(['/', '\\', '\0']);
        if !valid {
            return Err(AutomationError::Navigation {
                target: target.to_string(),
                message: "target is not a valid mailbox name".to_string(),
            });
        }
        Ok(self.account_dir.join(format!("{target}.{extension}")))
    }

    fn ensure_initialized(&self) -> AutomationResult<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(AutomationError::driver("mailbox is not initialized"))
        }
    }

    async fn read_inbox(&self, target: &str) -> AutomationResult<Vec<String>> {
        let path = self.file(target, "inbox")?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_marker(&self, target: &str) -> AutomationResult<usize> {
        let path = self.file(target, "read")?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(content.trim().parse().unwrap_or(0)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Appends a line to a target's inbox, as an inbound message would.
    pub async fn deliver(&self, target: &str, text: &str) -> AutomationResult<()> {
        let path = self.file(target, "inbox")?;
        fs::create_dir_all(&self.account_dir).await?;
        append_line(&path, &single_line(text)).await
    }

    /// Replies written so far for a target, without timestamps.
    pub async fn sent(&self, target: &str) -> AutomationResult<Vec<String>> {
        let path = self.file(target, "outbox")?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(content
                .lines()
                .filter_map(|line| line.split_once('\t').map(|(_, text)| text.to_string()))
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

fn single_line(text: &str) -> String {
    text.replace('\r', "").replace('\n', "\\n")
}

async fn append_line(path: &Path, line: &str) -> AutomationResult<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[async_trait]
impl AutomationContext for FileMailbox {
    async fn initialize(&self) -> AutomationResult<()> {
        fs::create_dir_all(&self.account_dir).await?;
        self.initialized.store(true, Ordering::Release);
        tracing::debug!(dir = %self.account_dir.display(), "mailbox initialized");
        Ok(())
    }

    async fn release(&self) -> AutomationResult<()> {
        self.initialized.store(false, Ordering::Release);
        tracing::debug!(dir = %self.account_dir.display(), "mailbox released");
        Ok(())
    }
}

#[async_trait]
impl Monitor for FileMailbox {
    /// True while the inbox holds lines past the read marker.
    async fn has_new_text(&self, target: &str) -> AutomationResult<bool> {
        self.ensure_initialized()?;
        let count = self.read_inbox(target).await?.len();
        Ok(count > self.read_marker(target).await?)
    }

    async fn latest_text(&self, target: &str) -> AutomationResult<Option<String>> {
        self.ensure_initialized()?;
        Ok(self
            .read_inbox(target)
            .await?
            .into_iter()
            .rev()
            .find(|line| !line.trim().is_empty()))
    }
}

#[async_trait]
impl Actions for FileMailbox {
    async fn mark_read(&self, target: &str) -> AutomationResult<bool> {
        self.ensure_initialized()?;
        let count = self.read_inbox(target).await?.len();
        let path = self.file(target, "read")?;
        fs::write(&path, count.to_string()).await?;
        Ok(true)
    }

    async fn send(&self, target: &str, text: &str) -> AutomationResult<bool> {
        self.ensure_initialized()?;
        if text.trim().is_empty() {
            return Ok(false);
        }
        let path = self.file(target, "outbox")?;
        let stamp = chrono::Local::now().to_rfc3339();
        append_line(&path, &format!("{stamp}\t{}", single_line(text))).await?;
        Ok(true)
    }
}
