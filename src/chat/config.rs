//! Configuration types for the chat client.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved configuration the
//! client runs with.

use std::time::Duration;

use arrrg_derive::CommandLine;

/// Default backend API root.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3001/api/";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Command-line arguments for the chatrelay-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Backend API root.
    #[arrrg(optional, "Backend API root (default: http://localhost:3001/api/)", "URL")]
    pub server: Option<String>,

    /// Resume an existing session.
    #[arrrg(optional, "Session id to use instead of a fresh one", "ID")]
    pub session: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Seconds to wait for the backend (default: 120)", "SECS")]
    pub timeout_secs: Option<u64>,

    /// Print rendered markup instead of plain text.
    #[arrrg(flag, "Print replies as rendered markup")]
    pub html: bool,
}

/// Resolved configuration for the chat client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Backend API root.
    pub server_url: String,

    /// Session id to resume, if any.
    pub session_id: Option<String>,

    /// How long to wait for each backend request.
    pub request_timeout: Duration,

    /// Whether replies are printed as rendered markup.
    pub show_markup: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            session_id: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            show_markup: false,
        }
    }

    /// Sets the backend API root.
    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    /// Sets the session to resume.
    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Sets whether replies are printed as markup.
    pub fn with_markup(mut self, show_markup: bool) -> Self {
        self.show_markup = show_markup;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            server_url: args
                .server
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            session_id: args.session.filter(|s| !s.trim().is_empty()),
            request_timeout: args
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            show_markup: args.html,
        }
    }
}
