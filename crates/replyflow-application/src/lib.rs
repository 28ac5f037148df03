//! Application layer for replyflow.
//!
//! Coordinates the rule engine from `replyflow-core` with automation
//! collaborators: one session task per account, supervised together and
//! stopped through a shared shutdown token.

pub mod session;
pub mod shutdown;
pub mod supervisor;

pub use session::{Collaborators, Session, SessionHandle, SessionState, SessionStatus};
pub use shutdown::{ShutdownToken, spawn_signal_listener};
pub use supervisor::Supervisor;
