//! Session storage.
//!
//! A [`SessionStore`] maps a session identifier to that session's ordered message history.
//! [`MemoryStore`] keeps everything in process memory and optionally forgets sessions that
//! have been idle for too long.  Reads hand out snapshots: two callers that read the same
//! session and then [`SessionStore::set`] it independently will overwrite one another.
//! [`crate::Conversation`] serializes turns per session to avoid that.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::observability::SESSIONS_EXPIRED;
use crate::types::Message;

/// An ordered conversation.  The system instruction, when present, is the first entry.
pub type History = Vec<Message>;

/// Keyed storage for conversation histories.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns a snapshot of the session's history, or `None` if the session is unknown.
    async fn get(&self, session_id: &str) -> Option<History>;

    /// Returns a snapshot of the session's history, creating a seeded one first if absent.
    async fn ensure(&self, session_id: &str) -> History;

    /// Replaces the session's history.
    async fn set(&self, session_id: &str, history: History);

    /// Forgets the session.  Returns true if it existed.
    async fn delete(&self, session_id: &str) -> bool;

    /// Number of sessions currently held.
    async fn len(&self) -> usize;

    /// Returns true if no sessions are held.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

struct Entry {
    history: History,
    touched: Instant,
}

/// In-process [`SessionStore`].
pub struct MemoryStore {
    seed: Option<Message>,
    idle_timeout: Option<Duration>,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Creates a store that seeds each new history with `system_prompt`, if given.
    pub fn new(system_prompt: Option<String>) -> Self {
        Self {
            seed: system_prompt.map(Message::system),
            idle_timeout: None,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Forget sessions that have not been written or ensured for `idle_timeout`.
    ///
    /// `None` keeps sessions forever.
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Returns the configured idle timeout.
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    /// Returns the history a new session starts with.
    pub fn seed_history(&self) -> History {
        self.seed.iter().cloned().collect()
    }

    /// Removes every idle session and returns how many were removed.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        let evicted = before - sessions.len();
        for _ in 0..evicted {
            SESSIONS_EXPIRED.click();
        }
        evicted
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        match self.idle_timeout {
            Some(timeout) => now.saturating_duration_since(entry.touched) > timeout,
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, session_id: &str) -> Option<History> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let expired = sessions
            .get(session_id)
            .is_some_and(|entry| self.is_expired(entry, now));
        if expired {
            sessions.remove(session_id);
            SESSIONS_EXPIRED.click();
            debug!(session_id, "session expired on read");
            return None;
        }
        sessions.get(session_id).map(|entry| entry.history.clone())
    }

    async fn ensure(&self, session_id: &str) -> History {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = sessions.get_mut(session_id) {
            if !self.is_expired(entry, now) {
                entry.touched = now;
                return entry.history.clone();
            }
            SESSIONS_EXPIRED.click();
            debug!(session_id, "session expired; starting over");
        }
        let history = self.seed_history();
        sessions.insert(
            session_id.to_string(),
            Entry {
                history: history.clone(),
                touched: now,
            },
        );
        history
    }

    async fn set(&self, session_id: &str, history: History) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            session_id.to_string(),
            Entry {
                history,
                touched: Instant::now(),
            },
        );
    }

    async fn delete(&self, session_id: &str) -> bool {
        self.sessions.lock().await.remove(session_id).is_some()
    }

    async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Creates a fresh session identifier: `session_<unix millis>_<9 alphanumerics>`.
pub fn new_session_id() -> String {
    let millis = ::time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", millis, &suffix[..9])
}

/// Spawns a task that calls [`MemoryStore::evict_idle`] every `every`.
pub fn spawn_sweeper(store: Arc<MemoryStore>, every: Duration) -> JoinHandle<()> {
    info!(interval_secs = every.as_secs(), "session sweeper started");
    tokio::spawn(async move {
        let mut timer = time::interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            timer.tick().await;
            let evicted = store.evict_idle().await;
            if evicted > 0 {
                info!(evicted, "evicted idle sessions");
            }
        }
    })
}
