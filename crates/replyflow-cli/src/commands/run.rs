use anyhow::{Result, bail};
use replyflow_application::supervisor::log_statuses;
use replyflow_application::{Collaborators, ShutdownToken, Supervisor, spawn_signal_listener};
use replyflow_core::config::AppConfig;
use replyflow_core::contact::ContactRemarkStore;
use replyflow_infrastructure::{FileMailbox, JsonContactStore, ReplyflowPaths};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Starts one session per selected account and waits until all of them
/// have stopped.
pub async fn execute(config: AppConfig, only: Option<&str>) -> Result<()> {
    let mailbox_root = ReplyflowPaths::mailbox_dir(&config.storage)?;
    let contacts: Arc<dyn ContactRemarkStore> = Arc::new(JsonContactStore::new(
        ReplyflowPaths::contacts_file(&config.storage)?,
    ));

    let shutdown = ShutdownToken::new();
    spawn_signal_listener(shutdown.clone());
    let mut supervisor = Supervisor::new(shutdown);

    for account in config.selected_accounts(only)? {
        let name = account.name.trim();
        let settings = match config.account_settings(account) {
            Ok(settings) => settings,
            Err(e) => {
                error!(account = %name, error = %e, "invalid account configuration, not starting");
                continue;
            }
        };

        let mailbox = Arc::new(FileMailbox::new(&mailbox_root, &settings.name));
        info!(account = %name, mailbox = %mailbox.account_dir().display(), "using file mailbox");
        supervisor.spawn_account(
            settings,
            Collaborators::from_driver(mailbox).with_contacts(Arc::clone(&contacts)),
        );
    }

    if supervisor.handles().is_empty() {
        bail!("No account could be started");
    }

    info!(
        sessions = supervisor.handles().len(),
        "replyflow running, press Ctrl+C to stop"
    );
    let statuses = supervisor
        .run_until_stopped(Duration::from_secs_f64(config.runtime.status_interval))
        .await;

    log_statuses(&statuses);
    info!("all sessions stopped");
    Ok(())
}
