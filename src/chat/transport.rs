//! How the chat client reaches the conversation manager.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as ReqwestClient;
use url::Url;

use crate::conversation::Conversation;
use crate::error::{Error, Result};
use crate::types::{ChatReply, ChatRequest, ClearRequest, ErrorBody};

/// The boundary between the chat client and the conversation manager.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Runs one turn and returns the assistant's reply.
    async fn send_turn(&self, session_id: &str, message: &str) -> Result<String>;

    /// Asks the conversation manager to forget the session.
    async fn clear(&self, session_id: &str) -> Result<()>;
}

#[async_trait::async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn send_turn(&self, session_id: &str, message: &str) -> Result<String> {
        (**self).send_turn(session_id, message).await
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        (**self).clear(session_id).await
    }
}

/// Talks to a chatrelay backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    base_url: Url,
}

impl HttpTransport {
    /// Creates a transport rooted at `base_url` (for example `http://localhost:3001/api/`).
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::transport(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };
        Ok(Self { client, base_url })
    }

    /// Returns the API root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn post<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let url = self.base_url.join(path)?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                Error::transport(format!("Failed to reach server: {}", e), Some(Box::new(e)))
            })?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => "Failed to get response".to_string(),
        };
        Err(Error::backend(status, message))
    }
}

#[async_trait::async_trait]
impl ChatTransport for HttpTransport {
    async fn send_turn(&self, session_id: &str, message: &str) -> Result<String> {
        let request = ChatRequest {
            message: message.to_string(),
            session_id: Some(session_id.to_string()),
        };
        let response = self.post("chat", &request).await?;
        let reply = response.json::<ChatReply>().await.map_err(|e| {
            Error::transport(
                format!("Malformed response from server: {}", e),
                Some(Box::new(e)),
            )
        })?;
        Ok(reply.message)
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        let request = ClearRequest {
            session_id: Some(session_id.to_string()),
        };
        self.post("clear", &request).await?;
        Ok(())
    }
}

/// Runs turns against an in-process [`Conversation`].
#[derive(Clone)]
pub struct LocalTransport {
    conversation: Arc<Conversation>,
}

impl LocalTransport {
    /// Wraps a conversation manager.
    pub fn new(conversation: Arc<Conversation>) -> Self {
        Self { conversation }
    }
}

#[async_trait::async_trait]
impl ChatTransport for LocalTransport {
    async fn send_turn(&self, session_id: &str, message: &str) -> Result<String> {
        self.conversation.run_turn(session_id, message).await
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        self.conversation.clear_session(session_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let transport = HttpTransport::new("http://localhost:3001/api", None).unwrap();
        assert_eq!(transport.base_url().as_str(), "http://localhost:3001/api/");
        assert_eq!(
            transport.base_url().join("chat").unwrap().as_str(),
            "http://localhost:3001/api/chat"
        );
    }

    #[test]
    fn bad_base_url() {
        assert!(HttpTransport::new("::", None).is_err());
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let transport =
            HttpTransport::new("http://127.0.0.1:1/api/", Some(Duration::from_secs(2))).unwrap();
        let err = transport.send_turn("s", "Hi").await.unwrap_err();
        assert!(err.is_transport());
    }
}
