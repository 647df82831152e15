// Public modules
pub mod chat;
pub mod client;
pub mod conversation;
pub mod error;
pub mod observability;
pub mod render;
pub mod server;
pub mod store;
pub mod types;

// Re-exports
pub use client::{Completion, CompletionClient};
pub use conversation::{Conversation, ConversationConfig, trim_history};
pub use error::{Error, ErrorKind, Result};
pub use observability::register_biometrics;
pub use render::{escape_html, render, render_opt, unescape_html};
pub use store::{History, MemoryStore, SessionStore, new_session_id};
pub use types::*;
