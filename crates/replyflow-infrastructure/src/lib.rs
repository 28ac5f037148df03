pub mod config_loader;
pub mod json_contact_store;
pub mod mailbox;
pub mod paths;
pub mod storage;

pub use crate::config_loader::{load_config, save_config, write_example_config};
pub use crate::json_contact_store::JsonContactStore;
pub use crate::mailbox::FileMailbox;
pub use crate::paths::ReplyflowPaths;
