//! Account sessions.
//!
//! # Module Structure
//!
//! - `state`: lifecycle states and published status snapshots
//! - `retry`: bounded retries of collaborator calls
//! - `runner`: the polling loop (`Session`) and its remote control (`SessionHandle`)

mod retry;
mod runner;
mod state;

pub use retry::{RetryError, RetryPolicy};
pub use runner::{Collaborators, Session, SessionHandle};
pub use state::{SessionState, SessionStatus};
