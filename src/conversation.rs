//! The chat turn protocol.
//!
//! A turn appends the user's message to the session history, hands the whole history to the
//! completion capability, appends the reply, and bounds the history length.  The user
//! message is stored before the completion runs and is not rolled back on failure, so a
//! failed turn leaves an unanswered user message behind for the next attempt to see.
//! The bound is applied when the user message is stored as well as after the reply, so
//! repeated failures cannot grow the history past `max_history`.
//!
//! Turns on one session are serialized by [`SessionLocks`].  This departs from a plain
//! read-modify-write relay, where overlapping turns race and the last write wins;
//! `ConversationConfig::with_serialized_turns(false)` restores that behavior.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::{self, Instant};
use tracing::{debug, error, info};

use crate::client::{API_KEY_ENV, Completion};
use crate::error::{Error, ErrorKind, Result};
use crate::observability::{
    HISTORY_TRIMMED, SESSIONS_CLEARED, TURN_CONFIGURATION_ERRORS, TURN_DURATION,
    TURN_INVALID_INPUT, TURN_TIMEOUTS, TURN_UPSTREAM_ERRORS, TURNS,
};
use crate::store::{History, SessionStore};
use crate::types::Message;

/// Default bound on stored history length.
pub const DEFAULT_MAX_HISTORY: usize = 20;

/// Default limit on a single completion call.
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(60);

/// The instruction every new session starts with.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an intelligent AI agent acting as a senior expert in your domain.

Your responsibilities:
- Clearly understand the user's intent before responding
- Ask clarifying questions only if the request is ambiguous
- Provide accurate, structured, and actionable answers
- Explain step-by-step when concepts are complex
- Use real-world examples when helpful
- Suggest best practices, edge cases, and improvements
- Be concise but thorough

Constraints:
- Do NOT hallucinate information
- If uncertain, explicitly say so and suggest verification steps
- Prefer practical solutions over theory
- Optimize responses for clarity and usefulness

Response formatting rules:
- Start every response with a short, relevant emoji icon
- Use clear headings and bullet points
- Use code blocks for any code
- Emphasize important points clearly
- Maintain a professional, helpful tone

Now assist the user with their request.";

/// Tunables for [`Conversation`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationConfig {
    /// Maximum number of stored messages after any turn.
    pub max_history: usize,

    /// Keep the leading system message when trimming.
    pub pin_system_message: bool,

    /// Limit on each completion call.  `None` waits forever.
    pub turn_timeout: Option<Duration>,

    /// Run at most one turn per session at a time.
    pub serialize_turns: bool,
}

impl ConversationConfig {
    /// Creates a config with default values.
    ///
    /// Defaults:
    /// - Max history: 20
    /// - System message: pinned
    /// - Turn timeout: 60 seconds
    /// - Per-session serialization: enabled
    pub fn new() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            pin_system_message: true,
            turn_timeout: Some(DEFAULT_TURN_TIMEOUT),
            serialize_turns: true,
        }
    }

    /// Sets the history bound.
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Sets whether the system message survives trimming.
    pub fn with_pinned_system_message(mut self, pin: bool) -> Self {
        self.pin_system_message = pin;
        self
    }

    /// Sets the completion timeout.
    pub fn with_turn_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.turn_timeout = timeout;
        self
    }

    /// Sets whether turns on the same session are serialized.
    pub fn with_serialized_turns(mut self, serialize: bool) -> Self {
        self.serialize_turns = serialize;
        self
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounds `history` to `max_len` entries, keeping the most recent ones in order.
///
/// With `pin_system` set and a system message at the head, the head is kept and the
/// remaining `max_len - 1` slots go to the most recent messages.  Returns true if anything
/// was removed.
pub fn trim_history(history: &mut History, max_len: usize, pin_system: bool) -> bool {
    if history.len() <= max_len {
        return false;
    }
    let pinned = pin_system && max_len > 0 && history.first().is_some_and(Message::is_system);
    if pinned {
        let start = history.len() - (max_len - 1);
        history.drain(1..start);
    } else {
        let start = history.len() - max_len;
        history.drain(..start);
    }
    true
}

/// Per-session locks.  Turns on one session queue behind each other; distinct sessions
/// never contend.
///
/// Without these locks, overlapping turns on one session each write back their own copy of
/// the history and the last write wins.
#[derive(Default)]
pub struct SessionLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the lock for a session.
    pub async fn get_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(session_id) {
                return Arc::clone(lock);
            }
        }

        let mut locks = self.locks.write().await;
        Arc::clone(
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Drops locks nobody is holding or waiting on.
    pub async fn cleanup_unused(&self) {
        let mut locks = self.locks.write().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of locks currently tracked.
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    /// Returns true if no locks are tracked.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Owns the turn protocol over an injected store and completion capability.
pub struct Conversation {
    store: Arc<dyn SessionStore>,
    completion: Arc<dyn Completion>,
    config: ConversationConfig,
    locks: SessionLocks,
}

impl Conversation {
    /// Creates a conversation manager with the default config.
    pub fn new(store: Arc<dyn SessionStore>, completion: Arc<dyn Completion>) -> Self {
        Self::with_config(store, completion, ConversationConfig::default())
    }

    /// Creates a conversation manager with a custom config.
    pub fn with_config(
        store: Arc<dyn SessionStore>,
        completion: Arc<dyn Completion>,
        config: ConversationConfig,
    ) -> Self {
        Self {
            store,
            completion,
            config,
            locks: SessionLocks::new(),
        }
    }

    /// Returns the active config.
    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    /// Returns the backing store.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Returns true if the completion capability is configured.
    pub fn is_configured(&self) -> bool {
        self.completion.is_configured()
    }

    /// Returns a snapshot of the session's stored history.
    pub async fn history(&self, session_id: &str) -> Option<History> {
        self.store.get(session_id).await
    }

    /// Runs one turn and returns the assistant's reply.
    ///
    /// # Errors
    ///
    /// - Invalid input if `user_text` is empty or whitespace; nothing is stored.
    /// - Configuration if the completion capability is not configured; nothing is stored.
    /// - Upstream if the completion fails or times out; the user message stays stored.
    pub async fn run_turn(&self, session_id: &str, user_text: &str) -> Result<String> {
        TURNS.click();
        let start = Instant::now();
        let result = self.run_turn_inner(session_id, user_text).await;
        TURN_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            match err.kind() {
                ErrorKind::InvalidInput => TURN_INVALID_INPUT.click(),
                ErrorKind::Configuration => TURN_CONFIGURATION_ERRORS.click(),
                ErrorKind::Upstream | ErrorKind::Transport => TURN_UPSTREAM_ERRORS.click(),
            }
        }
        result
    }

    async fn run_turn_inner(&self, session_id: &str, user_text: &str) -> Result<String> {
        if user_text.trim().is_empty() {
            return Err(Error::invalid_input(
                "Message is required",
                Some("message".to_string()),
            ));
        }
        if !self.completion.is_configured() {
            return Err(Error::configuration(format!(
                "{API_KEY_ENV} not configured on server"
            )));
        }

        let lock = if self.config.serialize_turns {
            Some(self.locks.get_lock(session_id).await)
        } else {
            None
        };
        let guard = match &lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let result = self.locked_turn(session_id, user_text).await;

        drop(guard);
        let serialized = lock.is_some();
        drop(lock);
        if serialized {
            self.locks.cleanup_unused().await;
        }
        result
    }

    async fn locked_turn(&self, session_id: &str, user_text: &str) -> Result<String> {
        let mut history = self.store.ensure(session_id).await;
        history.push(Message::user(user_text));
        self.trim(session_id, &mut history);
        self.store.set(session_id, history.clone()).await;
        debug!(session_id, history_len = history.len(), "running turn");

        let reply = match self.complete(&history).await {
            Ok(reply) => reply,
            Err(err) => {
                error!(session_id, error = %err, "turn failed");
                return Err(err);
            }
        };

        history.push(Message::assistant(reply.clone()));
        self.trim(session_id, &mut history);
        self.store.set(session_id, history).await;
        Ok(reply)
    }

    fn trim(&self, session_id: &str, history: &mut History) {
        if trim_history(
            history,
            self.config.max_history,
            self.config.pin_system_message,
        ) {
            HISTORY_TRIMMED.click();
            debug!(session_id, history_len = history.len(), "trimmed history");
        }
    }

    async fn complete(&self, history: &[Message]) -> Result<String> {
        let Some(limit) = self.config.turn_timeout else {
            return self.completion.complete(history).await;
        };
        match time::timeout(limit, self.completion.complete(history)).await {
            Ok(result) => result,
            Err(_) => {
                TURN_TIMEOUTS.click();
                Err(Error::timeout(
                    "completion did not finish in time",
                    Some(limit.as_secs_f64()),
                ))
            }
        }
    }

    /// Forgets the session.  Unknown sessions are a no-op.
    pub async fn clear_session(&self, session_id: &str) {
        if self.store.delete(session_id).await {
            SESSIONS_CLEARED.click();
            info!(session_id, "cleared session");
        }
    }
}
