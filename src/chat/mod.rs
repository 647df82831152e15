//! The chat client: an interactive front end for a chatrelay backend.
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`client`]: the transcript and turn state machine
//! - [`transport`]: how turns reach a conversation manager, over HTTP or in process
//! - [`commands`]: slash command parsing

mod client;
mod commands;
mod config;
mod transport;

pub use crate::store::new_session_id;
pub use client::{ChatClient, ClientState, RenderedMessage, failure_text};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_SERVER_URL};
pub use transport::{ChatTransport, HttpTransport, LocalTransport};
