//! Runs every account session as its own task.

use crate::session::{Collaborators, Session, SessionHandle, SessionStatus};
use crate::shutdown::ShutdownToken;
use replyflow_core::config::AccountSettings;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::info;

pub struct Supervisor {
    tracker: TaskTracker,
    shutdown: ShutdownToken,
    handles: Vec<SessionHandle>,
}

impl Supervisor {
    pub fn new(shutdown: ShutdownToken) -> Self {
        Self {
            tracker: TaskTracker::new(),
            shutdown,
            handles: Vec::new(),
        }
    }

    pub fn shutdown_token(&self) -> &ShutdownToken {
        &self.shutdown
    }

    /// Spawns `session` on the tracker. A session that fails or stops on its
    /// own never affects the others.
    pub fn spawn(&mut self, mut session: Session) -> SessionHandle {
        let handle = session.handle();
        let account = session.account().to_string();
        info!(account = %account, "Starting session task");

        self.tracker.spawn(async move {
            let status = session.run().await;
            info!(
                account = %account,
                state = %status.state,
                replies_sent = status.replies_sent,
                "Session task completed"
            );
        });

        self.handles.push(handle.clone());
        handle
    }

    /// Builds a session under this supervisor's shutdown token and spawns it.
    pub fn spawn_account(
        &mut self,
        account: AccountSettings,
        collaborators: Collaborators,
    ) -> SessionHandle {
        let session = Session::new(account, collaborators, &self.shutdown);
        self.spawn(session)
    }

    pub fn handles(&self) -> &[SessionHandle] {
        &self.handles
    }

    pub fn handle(&self, account: &str) -> Option<&SessionHandle> {
        self.handles.iter().find(|h| h.account() == account)
    }

    pub fn statuses(&self) -> Vec<SessionStatus> {
        self.handles.iter().map(SessionHandle::status).collect()
    }

    /// Requests a stop of every session.
    pub fn stop_all(&self) {
        self.shutdown.request();
        for handle in &self.handles {
            handle.stop();
        }
    }

    /// Waits for every session to finish and returns their final status.
    pub async fn wait(self) -> Vec<SessionStatus> {
        self.tracker.close();
        self.tracker.wait().await;
        self.statuses()
    }

    /// Like [`Supervisor::wait`], logging every session's status each
    /// `status_interval` while waiting.
    pub async fn run_until_stopped(self, status_interval: Duration) -> Vec<SessionStatus> {
        self.tracker.close();
        let mut ticker = tokio::time::interval(status_interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                () = self.tracker.wait() => break,
                _ = ticker.tick() => log_statuses(&self.statuses()),
            }
        }
        self.statuses()
    }
}

pub fn log_statuses(statuses: &[SessionStatus]) {
    for status in statuses {
        info!(
            account = %status.account_name,
            state = %status.state,
            consecutive_errors = status.consecutive_errors,
            targets = status.monitored_target_count,
            rules = status.active_rule_count,
            replies_sent = status.replies_sent,
            "session status"
        );
    }
}
