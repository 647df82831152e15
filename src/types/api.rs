//! Wire types for the backend HTTP surface shared by the server and the chat client.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The user's message.  Missing is treated the same as empty.
    #[serde(default)]
    pub message: String,

    /// Session to run the turn against.  The server assigns one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Success body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    /// The assistant's response text.
    pub message: String,

    /// The session the turn ran against.
    pub session_id: String,
}

/// Body of `POST /api/clear`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClearRequest {
    /// Session to forget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Body returned by `POST /api/clear`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClearReply {
    /// Always true.
    pub success: bool,
}

/// Body returned by `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthReply {
    /// Always `"ok"`.
    pub status: String,

    /// Free-form status line.
    pub message: String,
}

/// Body of every non-2xx backend response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Human-readable description of what went wrong.
    pub error: String,
}
