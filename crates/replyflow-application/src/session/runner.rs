//! The per-account polling loop.

use super::retry::{RetryError, RetryPolicy, accepted, with_retry};
use super::state::{SessionState, SessionStatus};
use crate::shutdown::ShutdownToken;
use replyflow_core::ReplyflowError;
use replyflow_core::automation::{Actions, AutomationContext, Monitor};
use replyflow_core::config::{AccountSettings, SessionSettings};
use replyflow_core::contact::ContactRemarkStore;
use replyflow_core::rule::{ReplyVariables, Rule, RuleEngine, TemplateContext, render};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// External collaborators of one session.
#[derive(Clone)]
pub struct Collaborators {
    pub monitor: Arc<dyn Monitor>,
    pub actions: Arc<dyn Actions>,
    pub context: Arc<dyn AutomationContext>,
    pub contacts: Option<Arc<dyn ContactRemarkStore>>,
}

impl Collaborators {
    pub fn new(
        monitor: Arc<dyn Monitor>,
        actions: Arc<dyn Actions>,
        context: Arc<dyn AutomationContext>,
    ) -> Self {
        Self {
            monitor,
            actions,
            context,
            contacts: None,
        }
    }

    /// Uses one driver object for all three roles.
    pub fn from_driver<D>(driver: Arc<D>) -> Self
    where
        D: Monitor + Actions + AutomationContext + 'static,
    {
        Self::new(driver.clone(), driver.clone(), driver)
    }

    pub fn with_contacts(mut self, contacts: Arc<dyn ContactRemarkStore>) -> Self {
        self.contacts = Some(contacts);
        self
    }
}

/// Outcome of one target within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetOutcome {
    Idle,
    MarkedRead,
    Replied,
}

/// Control surface of a session that is running elsewhere.
#[derive(Clone)]
pub struct SessionHandle {
    account: String,
    stop: ShutdownToken,
    status: watch::Receiver<SessionStatus>,
    engine: Arc<RuleEngine>,
}

impl SessionHandle {
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Asks the session to stop. It returns within one suspension point.
    pub fn stop(&self) {
        self.stop.request();
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Waits until a published status satisfies `predicate`.
    ///
    /// Returns the last known status if the session is dropped first.
    pub async fn wait_until<F>(&self, mut predicate: F) -> SessionStatus
    where
        F: FnMut(&SessionStatus) -> bool,
    {
        let mut rx = self.status.clone();
        if let Ok(status) = rx.wait_for(|s| predicate(s)).await {
            return status.clone();
        }
        rx.borrow().clone()
    }

    pub async fn wait_for_state(&self, state: SessionState) -> SessionStatus {
        self.wait_until(|s| s.state == state).await
    }

    /// Replaces the rule set. Takes effect on the next message.
    pub fn update_rules(&self, rules: Vec<Rule>) {
        info!(account = %self.account, rules = rules.len(), "rules updated");
        self.engine.update_rules(rules);
    }

    pub fn set_rule_enabled(&self, index: usize, enabled: bool) -> bool {
        self.engine.set_rule_enabled(index, enabled)
    }
}

/// One account: a rule engine polling an ordered list of targets.
pub struct Session {
    account: String,
    targets: Vec<String>,
    settings: SessionSettings,
    engine: Arc<RuleEngine>,
    collaborators: Collaborators,
    stop: ShutdownToken,
    status: watch::Sender<SessionStatus>,
    state: SessionState,
    consecutive_errors: u32,
    replies_sent: u64,
    last_error: Option<String>,
    init_attempted: bool,
    cleaned_up: bool,
}

impl Session {
    /// Builds a session whose stop token is a child of `shutdown`.
    pub fn new(
        account: AccountSettings,
        collaborators: Collaborators,
        shutdown: &ShutdownToken,
    ) -> Self {
        let engine = Arc::new(RuleEngine::with_seed(
            account.rules,
            account.session.random_seed,
        ));
        let initial = SessionStatus {
            account_name: account.name.clone(),
            state: SessionState::Created,
            consecutive_errors: 0,
            monitored_target_count: account.monitor_targets.len(),
            active_rule_count: engine.active_rule_count(),
            replies_sent: 0,
            last_error: None,
        };
        let (status, _) = watch::channel(initial);

        Self {
            account: account.name,
            targets: account.monitor_targets,
            settings: account.session,
            engine,
            collaborators,
            stop: shutdown.child(),
            status,
            state: SessionState::Created,
            consecutive_errors: 0,
            replies_sent: 0,
            last_error: None,
            init_attempted: false,
            cleaned_up: false,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            account: self.account.clone(),
            stop: self.stop.clone(),
            status: self.status.subscribe(),
            engine: Arc::clone(&self.engine),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn engine(&self) -> &Arc<RuleEngine> {
        &self.engine
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            account_name: self.account.clone(),
            state: self.state,
            consecutive_errors: self.consecutive_errors,
            monitored_target_count: self.targets.len(),
            active_rule_count: self.engine.active_rule_count(),
            replies_sent: self.replies_sent,
            last_error: self.last_error.clone(),
        }
    }

    fn publish(&self) {
        self.status.send_replace(self.status());
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            warn!(account = %self.account, from = %self.state, to = %next, "unexpected state transition");
        }
        debug!(account = %self.account, from = %self.state, to = %next, "session state changed");
        self.state = next;
        self.publish();
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.settings.max_retry_count,
            delay: self.settings.retry_delay,
        }
    }

    /// Waits `duration` unless a stop is requested first. Returns false if
    /// the wait was interrupted.
    async fn pause(&self, duration: Duration) -> bool {
        if self.stop.requested() {
            return false;
        }
        if duration.is_zero() {
            return true;
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => true,
            () = self.stop.cancelled() => false,
        }
    }

    /// Runs the session until it stops and returns the final status.
    ///
    /// A session runs once; calling `run` again only returns the status.
    pub async fn run(&mut self) -> SessionStatus {
        if self.state != SessionState::Created {
            warn!(account = %self.account, state = %self.state, "session already started");
            return self.status();
        }

        if self.stop.requested() {
            self.shutdown().await;
            return self.status();
        }

        info!(
            account = %self.account,
            targets = self.targets.len(),
            rules = self.engine.active_rule_count(),
            "session starting"
        );
        self.set_state(SessionState::Initializing);
        self.init_attempted = true;

        let context = Arc::clone(&self.collaborators.context);
        let initialized = tokio::select! {
            result = context.initialize() => Some(result),
            () = self.stop.cancelled() => None,
        };
        match initialized {
            Some(Ok(())) => {
                info!(account = %self.account, "automation context initialized");
                self.set_state(SessionState::Running);
            }
            Some(Err(e)) => {
                let err = ReplyflowError::init_failure(&self.account, e.to_string());
                error!(account = %self.account, error = %err, "initialization failed");
                self.last_error = Some(err.to_string());
                self.cleanup().await;
                self.set_state(SessionState::Stopped);
                return self.status();
            }
            None => {
                self.shutdown().await;
                return self.status();
            }
        }

        while !self.stop.requested() {
            match self.state {
                SessionState::Running => self.tick().await,
                SessionState::Degraded => self.recover().await,
                _ => break,
            }
        }

        self.shutdown().await;
        self.status()
    }

    async fn shutdown(&mut self) {
        self.set_state(SessionState::Stopping);
        self.cleanup().await;
        self.set_state(SessionState::Stopped);
        info!(
            account = %self.account,
            replies_sent = self.replies_sent,
            "session stopped"
        );
    }

    /// Releases the automation context. Runs its body at most once, and
    /// only if initialization was attempted.
    pub async fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;
        if !self.init_attempted {
            return;
        }
        if let Err(e) = self.collaborators.context.release().await {
            warn!(account = %self.account, error = %e, "failed to release automation context");
        }
    }

    /// Processes every target once, in configured order.
    async fn tick(&mut self) {
        let mut failed = false;
        let targets = self.targets.clone();

        for target in &targets {
            if self.stop.requested() {
                return;
            }
            match self.process_target(target).await {
                Ok(TargetOutcome::Replied) => self.publish(),
                Ok(_) => {}
                Err(RetryError::Cancelled) => return,
                Err(RetryError::Exhausted { attempts, last }) => {
                    if self.stop.requested() {
                        return;
                    }
                    failed = true;
                    self.consecutive_errors += 1;
                    self.last_error = Some(format!("{target}: {last}"));
                    warn!(
                        account = %self.account,
                        target = %target,
                        attempts,
                        consecutive_errors = self.consecutive_errors,
                        error = %last,
                        "target processing failed"
                    );
                    self.publish();

                    if self.consecutive_errors >= self.settings.max_consecutive_errors {
                        warn!(
                            account = %self.account,
                            consecutive_errors = self.consecutive_errors,
                            "too many consecutive errors, entering degraded mode"
                        );
                        self.set_state(SessionState::Degraded);
                        return;
                    }
                }
            }
        }

        let wait = if failed {
            self.settings.check_interval.saturating_mul(2)
        } else {
            if self.consecutive_errors > 0 {
                self.consecutive_errors = 0;
                self.publish();
            }
            self.settings.check_interval
        };
        self.pause(wait).await;
    }

    async fn process_target(&mut self, target: &str) -> Result<TargetOutcome, RetryError> {
        let policy = self.retry_policy();
        let monitor = Arc::clone(&self.collaborators.monitor);
        let actions = Arc::clone(&self.collaborators.actions);
        let actions: &dyn Actions = actions.as_ref();

        let has_new = with_retry(policy, &self.stop, "has_new_text", target, || {
            monitor.has_new_text(target)
        })
        .await?;
        if !has_new {
            return Ok(TargetOutcome::Idle);
        }

        let text = with_retry(policy, &self.stop, "latest_text", target, || {
            monitor.latest_text(target)
        })
        .await?;
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return Ok(TargetOutcome::Idle);
        };

        let result = self.engine.process_message(&text);
        let Some(rule) = result.rule.clone().filter(|_| result.matched) else {
            debug!(account = %self.account, target = %target, "no rule matched, marking read");
            with_retry(policy, &self.stop, "mark_read", target, || async move {
                accepted("mark_read", target, actions.mark_read(target).await?)
            })
            .await?;
            return Ok(TargetOutcome::MarkedRead);
        };

        let context = self.template_context(target, &text).await;
        let reply = render(rule.reply_template(), &context);
        info!(
            account = %self.account,
            target = %target,
            pattern = result.matched_pattern.as_deref().unwrap_or_default(),
            delay = result.rendered_delay,
            "rule matched"
        );

        // bounded by rule validation
        let delay = Duration::try_from_secs_f64(result.rendered_delay).unwrap_or(Duration::MAX);
        if !self.pause(delay).await {
            return Err(RetryError::Cancelled);
        }

        with_retry(policy, &self.stop, "mark_read", target, || async move {
            accepted("mark_read", target, actions.mark_read(target).await?)
        })
        .await?;
        let reply = reply.as_str();
        with_retry(policy, &self.stop, "send", target, || async move {
            accepted("send", target, actions.send(target, reply).await?)
        })
        .await?;

        self.replies_sent += 1;
        info!(account = %self.account, target = %target, "reply sent");
        Ok(TargetOutcome::Replied)
    }

    async fn template_context(&self, target: &str, content: &str) -> TemplateContext {
        let sender_name = match &self.collaborators.contacts {
            Some(store) => match store.get(target).await {
                Ok(Some(contact)) => contact.preferred_name().to_string(),
                Ok(None) => target.to_string(),
                Err(e) => {
                    warn!(account = %self.account, target = %target, error = %e, "contact lookup failed");
                    target.to_string()
                }
            },
            None => target.to_string(),
        };

        ReplyVariables {
            account: &self.account,
            target,
            sender_name: &sender_name,
            content,
        }
        .to_context(&chrono::Local::now())
    }

    /// One degraded cycle: wait, then release and reinitialize the context.
    async fn recover(&mut self) {
        let wait = self.settings.degraded_interval();
        info!(account = %self.account, wait_secs = wait.as_secs_f64(), "degraded, waiting before recovery");
        if !self.pause(wait).await {
            return;
        }

        let context = Arc::clone(&self.collaborators.context);
        if let Err(e) = context.release().await {
            warn!(account = %self.account, error = %e, "release before recovery failed");
        }

        let initialized = tokio::select! {
            result = context.initialize() => result,
            () = self.stop.cancelled() => return,
        };
        match initialized {
            Ok(()) => {
                info!(account = %self.account, "recovered from degraded mode");
                self.consecutive_errors = 0;
                self.set_state(SessionState::Running);
            }
            Err(e) => {
                warn!(account = %self.account, error = %e, "recovery failed, staying degraded");
                self.last_error = Some(format!("recovery failed: {e}"));
                self.publish();
            }
        }
    }
}
