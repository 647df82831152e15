//! The interactive side of a conversation.
//!
//! [`ChatClient`] keeps the visible transcript for one session and drives turns through a
//! [`ChatTransport`].  The transcript is local and optimistic: user messages appear before
//! the backend answers, failures show up as a synthetic assistant message, and clearing
//! always empties the transcript even when the backend cannot be reached.

use tracing::{debug, warn};

use crate::chat::transport::ChatTransport;
use crate::error::{Error, Result};
use crate::render::render;
use crate::store::new_session_id;
use crate::types::{Message, MessageRole};

/// Where the client is in the turn protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    /// Ready for input.
    Idle,
    /// A turn is in flight; further submissions are refused.
    AwaitingResponse,
    /// The last turn failed.  Submission is allowed again.
    Error(String),
}

impl ClientState {
    /// True when a new turn may be submitted.
    pub fn accepts_input(&self) -> bool {
        !matches!(self, ClientState::AwaitingResponse)
    }
}

/// A transcript entry turned into markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Who wrote the message.
    pub role: MessageRole,
    /// Markup that is safe to inject into a page.
    pub html: String,
}

/// The text shown in place of an assistant reply when a turn fails.
pub fn failure_text(err: &Error) -> String {
    format!(
        "I apologize, but I encountered an error: {}. Please try again.",
        err.message()
    )
}

/// Chat state for one session.
pub struct ChatClient<T: ChatTransport> {
    transport: T,
    session_id: String,
    transcript: Vec<Message>,
    state: ClientState,
}

impl<T: ChatTransport> ChatClient<T> {
    /// Creates a client with a fresh session id.
    pub fn new(transport: T) -> Self {
        Self::with_session_id(transport, new_session_id())
    }

    /// Creates a client that continues `session_id`.
    pub fn with_session_id(transport: T, session_id: impl Into<String>) -> Self {
        Self {
            transport,
            session_id: session_id.into(),
            transcript: Vec::new(),
            state: ClientState::Idle,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// True while a turn is in flight.
    pub fn is_loading(&self) -> bool {
        self.state == ClientState::AwaitingResponse
    }

    /// Starts a turn: appends the user message and moves to `AwaitingResponse`.
    ///
    /// Returns the text to send.  Empty input and a turn already in flight are refused
    /// without touching the transcript.
    pub fn begin_turn(&mut self, input: &str) -> Result<String> {
        if !self.state.accepts_input() {
            return Err(Error::invalid_input(
                "a response is still pending",
                None,
            ));
        }
        let text = input.trim();
        if text.is_empty() {
            return Err(Error::invalid_input(
                "Message is required",
                Some("message".to_string()),
            ));
        }
        self.transcript.push(Message::user(text));
        self.state = ClientState::AwaitingResponse;
        Ok(text.to_string())
    }

    /// Finishes the pending turn with the backend's outcome and returns the message that
    /// was appended.  A failure still appends an assistant message describing it.
    pub fn complete_turn(&mut self, outcome: Result<String>) -> &Message {
        let message = match outcome {
            Ok(reply) => {
                self.state = ClientState::Idle;
                Message::assistant(reply)
            }
            Err(err) => {
                warn!(session_id = %self.session_id, error = %err, "turn failed");
                self.state = ClientState::Error(err.message().to_string());
                Message::assistant(failure_text(&err))
            }
        };
        self.transcript.push(message);
        &self.transcript[self.transcript.len() - 1]
    }

    /// Runs one full turn.
    ///
    /// # Errors
    ///
    /// Only for input that was refused by [`ChatClient::begin_turn`].  Backend failures are
    /// reported through the transcript.
    pub async fn submit(&mut self, input: &str) -> Result<&Message> {
        let text = self.begin_turn(input)?;
        debug!(session_id = %self.session_id, "submitting turn");
        let outcome = self.transport.send_turn(&self.session_id, &text).await;
        Ok(self.complete_turn(outcome))
    }

    /// Empties the transcript and asks the backend to forget the session.
    pub async fn clear(&mut self) {
        self.transcript.clear();
        self.state = ClientState::Idle;
        if let Err(err) = self.transport.clear(&self.session_id).await {
            warn!(session_id = %self.session_id, error = %err, "failed to clear session");
        }
    }

    /// The transcript as markup.  Every entry goes through [`render`], whoever wrote it.
    pub fn rendered(&self) -> Vec<RenderedMessage> {
        self.transcript
            .iter()
            .map(|message| RenderedMessage {
                role: message.role,
                html: render(&message.content),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<Vec<Result<String>>>,
        sent: Mutex<Vec<(String, String)>>,
        cleared: Mutex<Vec<String>>,
        fail_clear: bool,
    }

    impl ScriptedTransport {
        fn replying(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                ..Self::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send_turn(&self, session_id: &str, message: &str) -> Result<String> {
            self.sent
                .lock()
                .unwrap()
                .push((session_id.to_string(), message.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(Error::backend(500, "no reply scripted")))
        }

        async fn clear(&self, session_id: &str) -> Result<()> {
            self.cleared.lock().unwrap().push(session_id.to_string());
            if self.fail_clear {
                Err(Error::transport("Failed to reach server", None))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn successful_turn() {
        let mut client =
            ChatClient::with_session_id(ScriptedTransport::replying(vec![Ok("Hello!".into())]), "s1");
        let reply = client.submit("  Hi  ").await.unwrap();
        assert_eq!(reply, &Message::assistant("Hello!"));
        assert_eq!(
            client.transcript(),
            &[Message::user("Hi"), Message::assistant("Hello!")]
        );
        assert_eq!(client.state(), &ClientState::Idle);
        assert_eq!(
            client.transport.sent.lock().unwrap().as_slice(),
            &[("s1".to_string(), "Hi".to_string())]
        );
    }

    #[tokio::test]
    async fn failed_turn_appends_apology() {
        let mut client = ChatClient::new(ScriptedTransport::replying(vec![Err(Error::backend(
            500,
            "GROQ_API_KEY not configured on server",
        ))]));
        let reply = client.submit("Hi").await.unwrap().clone();
        assert_eq!(reply.role, MessageRole::Assistant);
        assert_eq!(
            reply.content,
            "I apologize, but I encountered an error: GROQ_API_KEY not configured on server. Please try again."
        );
        assert_eq!(client.transcript().len(), 2);
        assert!(matches!(client.state(), ClientState::Error(_)));
        assert!(client.state().accepts_input());
    }

    #[tokio::test]
    async fn empty_input_is_refused() {
        let mut client = ChatClient::new(ScriptedTransport::default());
        let err = client.submit("   ").await.unwrap_err();
        assert!(err.is_invalid_input());
        assert!(client.transcript().is_empty());
        assert!(client.transport.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn no_second_submission_while_waiting() {
        let mut client = ChatClient::new(ScriptedTransport::default());
        client.begin_turn("first").unwrap();
        assert!(client.is_loading());
        let err = client.begin_turn("second").unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(client.transcript(), &[Message::user("first")]);

        client.complete_turn(Ok("done".to_string()));
        assert!(!client.is_loading());
        assert!(client.begin_turn("second").is_ok());
    }

    #[tokio::test]
    async fn clear_resets_even_when_backend_fails() {
        let transport = ScriptedTransport {
            fail_clear: true,
            ..ScriptedTransport::replying(vec![Ok("a".into())])
        };
        let mut client = ChatClient::with_session_id(transport, "s2");
        client.submit("q").await.unwrap();
        client.clear().await;
        assert!(client.transcript().is_empty());
        assert_eq!(client.state(), &ClientState::Idle);
        assert_eq!(client.session_id(), "s2");
        assert_eq!(
            client.transport.cleared.lock().unwrap().as_slice(),
            &["s2".to_string()]
        );
    }

    #[tokio::test]
    async fn rendered_transcript() {
        let mut client = ChatClient::new(ScriptedTransport::replying(vec![Ok(
            "**yes** <b>".into(),
        )]));
        client.submit("is **this** <i>safe</i>?").await.unwrap();
        let rendered = client.rendered();
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].role, MessageRole::User);
        assert_eq!(
            rendered[0].html,
            r#"is <span class="highlight">this</span> &lt;i&gt;safe&lt;/i&gt;?"#
        );
        assert_eq!(
            rendered[1].html,
            r#"<span class="highlight">yes</span> &lt;b&gt;"#
        );
    }
}
