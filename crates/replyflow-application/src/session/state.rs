use serde::Serialize;
use std::fmt;

/// Lifecycle of an account session.
///
/// ```text
/// Created -> Initializing -> Running <-> Degraded
///                 |             |           |
///                 v             v           v
///              Stopped <---- Stopping <-----+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Created,
    Initializing,
    Running,
    Degraded,
    Stopping,
    Stopped,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Initializing => "INITIALIZING",
            Self::Running => "RUNNING",
            Self::Degraded => "DEGRADED",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// True while the session polls targets or tries to recover.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Degraded)
    }

    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Created, Initializing)
                | (Created, Stopping)
                | (Initializing, Running)
                | (Initializing, Stopping)
                | (Initializing, Stopped)
                | (Running, Degraded)
                | (Running, Stopping)
                | (Degraded, Running)
                | (Degraded, Stopping)
                | (Stopping, Stopped)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a session, published on every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub account_name: String,
    pub state: SessionState,
    pub consecutive_errors: u32,
    pub monitored_target_count: usize,
    pub active_rule_count: usize,
    pub replies_sent: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use SessionState::*;
        assert!(Created.can_transition_to(Initializing));
        assert!(Running.can_transition_to(Degraded));
        assert!(Degraded.can_transition_to(Running));
        assert!(Stopping.can_transition_to(Stopped));
        assert!(!Stopped.can_transition_to(Running));
        assert!(!Created.can_transition_to(Running));
        assert!(!Degraded.can_transition_to(Stopped));
    }

    #[test]
    fn test_status_serializes_state_name() {
        let status = SessionStatus {
            account_name: "a".into(),
            state: SessionState::Degraded,
            consecutive_errors: 5,
            monitored_target_count: 2,
            active_rule_count: 1,
            replies_sent: 0,
            last_error: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "DEGRADED");
        assert!(json.get("last_error").is_none());
    }
}
