#![allow(dead_code)]

use async_trait::async_trait;
use replyflow_core::AutomationError;
use replyflow_core::automation::{Actions, AutomationContext, AutomationResult, Monitor};
use replyflow_core::config::{AccountSettings, SessionSettings};
use replyflow_core::contact::{ContactRemark, ContactRemarkStore};
use replyflow_core::rule::{Rule, RuleConfig};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted in-memory driver recording every call in order.
#[derive(Default)]
pub struct MockDriver {
    state: Mutex<Script>,
}

#[derive(Default)]
struct Script {
    inbox: HashMap<String, VecDeque<String>>,
    calls: Vec<String>,
    monitor_failing: bool,
    init_results: VecDeque<bool>,
    init_fails: bool,
    send_rejections: u32,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliver(&self, target: &str, text: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .inbox
            .entry(target.to_string())
            .or_default()
            .push_back(text.to_string());
    }

    pub fn set_monitor_failing(&self, failing: bool) {
        self.state.lock().unwrap().monitor_failing = failing;
    }

    /// Every `initialize` fails from now on.
    pub fn set_init_failing(&self, failing: bool) {
        self.state.lock().unwrap().init_fails = failing;
    }

    /// Outcomes for the next `initialize` calls, consumed in order.
    pub fn script_init(&self, results: &[bool]) {
        self.state.lock().unwrap().init_results = results.iter().copied().collect();
    }

    /// The next `n` sends answer `Ok(false)`.
    pub fn reject_sends(&self, n: u32) {
        self.state.lock().unwrap().send_rejections = n;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl AutomationContext for MockDriver {
    async fn initialize(&self) -> AutomationResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("initialize".to_string());
        let ok = state.init_results.pop_front().unwrap_or(!state.init_fails);
        if ok {
            Ok(())
        } else {
            Err(AutomationError::driver("browser did not start"))
        }
    }

    async fn release(&self) -> AutomationResult<()> {
        self.record("release".to_string());
        Ok(())
    }
}

#[async_trait]
impl Monitor for MockDriver {
    async fn has_new_text(&self, target: &str) -> AutomationResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("has_new_text:{target}"));
        if state.monitor_failing {
            return Err(AutomationError::Timeout {
                operation: "has_new_text".to_string(),
            });
        }
        Ok(state.inbox.get(target).is_some_and(|q| !q.is_empty()))
    }

    async fn latest_text(&self, target: &str) -> AutomationResult<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("latest_text:{target}"));
        Ok(state.inbox.get(target).and_then(|q| q.front().cloned()))
    }
}

#[async_trait]
impl Actions for MockDriver {
    async fn mark_read(&self, target: &str) -> AutomationResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("mark_read:{target}"));
        if let Some(queue) = state.inbox.get_mut(target) {
            queue.pop_front();
        }
        Ok(true)
    }

    async fn send(&self, target: &str, text: &str) -> AutomationResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("send:{target}:{text}"));
        if state.send_rejections > 0 {
            state.send_rejections -= 1;
            return Ok(false);
        }
        Ok(true)
    }
}

/// In-memory contact store.
#[derive(Default)]
pub struct MemoryContacts {
    contacts: Mutex<HashMap<String, ContactRemark>>,
}

impl MemoryContacts {
    pub fn with(target_id: &str, display_name: &str, remark: Option<&str>) -> Self {
        let store = Self::default();
        store.contacts.lock().unwrap().insert(
            target_id.to_string(),
            ContactRemark {
                target_id: target_id.to_string(),
                display_name: display_name.to_string(),
                remark: remark.map(str::to_string),
            },
        );
        store
    }
}

#[async_trait]
impl ContactRemarkStore for MemoryContacts {
    async fn get(&self, target_id: &str) -> replyflow_core::Result<Option<ContactRemark>> {
        Ok(self.contacts.lock().unwrap().get(target_id).cloned())
    }

    async fn set(
        &self,
        target_id: &str,
        display_name: &str,
        remark: Option<&str>,
    ) -> replyflow_core::Result<ContactRemark> {
        let contact = ContactRemark {
            target_id: target_id.to_string(),
            display_name: display_name.to_string(),
            remark: remark.map(str::to_string),
        };
        self.contacts
            .lock()
            .unwrap()
            .insert(target_id.to_string(), contact.clone());
        Ok(contact)
    }

    async fn list(&self) -> replyflow_core::Result<Vec<ContactRemark>> {
        Ok(self.contacts.lock().unwrap().values().cloned().collect())
    }
}

pub fn rule(keywords: &[&str], template: &str) -> Rule {
    Rule::new(RuleConfig::new(keywords, template)).unwrap()
}

pub fn fast_settings() -> SessionSettings {
    SessionSettings {
        check_interval: Duration::from_millis(100),
        max_consecutive_errors: 3,
        max_retry_count: 3,
        retry_delay: Duration::from_millis(10),
        degraded_interval_factor: 3.0,
        random_seed: Some(7),
    }
}

pub fn account(name: &str, targets: &[&str], rules: Vec<Rule>) -> AccountSettings {
    AccountSettings {
        name: name.to_string(),
        monitor_targets: targets.iter().map(|t| t.to_string()).collect(),
        rules,
        session: fast_settings(),
    }
}
