use serde::{Deserialize, Serialize};

use crate::types::{Message, MessageRole};

/// Request body for an OpenAI-compatible `chat/completions` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionParams {
    /// Model identifier understood by the upstream API.
    pub model: String,

    /// The full ordered conversation, system instruction first.
    pub messages: Vec<Message>,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatCompletionParams {
    /// Create new params for the given model and messages.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the output length limit.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// The message carried by a [`Choice`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChoiceMessage {
    /// Role reported by the API; normally `assistant`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,

    /// Generated text.  Some providers send `null` for refusals.
    #[serde(default)]
    pub content: Option<String>,
}

/// One candidate response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    /// Position of this choice in the response.
    #[serde(default)]
    pub index: u32,

    /// The generated message.
    pub message: ChoiceMessage,

    /// Why generation stopped, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Successful response body of a `chat/completions` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletion {
    /// Provider-assigned response id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Model that produced the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Candidate responses, best first.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ChatCompletion {
    /// Returns the text of the top choice, if there is one.
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// Error details inside an [`ApiErrorResponse`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiErrorObject {
    /// Human-readable error message.
    #[serde(default)]
    pub message: Option<String>,

    /// Error category string.
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,

    /// Provider-specific error code; some providers send strings, some numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<serde_json::Value>,
}

/// Error body returned by the upstream API on a non-success status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiErrorResponse {
    /// The error object, when the provider sent one.
    #[serde(default)]
    pub error: Option<ApiErrorObject>,
}

impl ApiErrorResponse {
    /// Returns the error message, if the provider sent one.
    pub fn message(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.message.as_deref())
    }

    /// Returns the error type, if the provider sent one.
    pub fn error_type(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.error_type.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_serialization() {
        let params = ChatCompletionParams::new(
            "openai/gpt-oss-120b",
            vec![Message::system("Be brief."), Message::user("Hi")],
        )
        .with_temperature(Some(0.5))
        .with_max_tokens(Some(2000));

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            json,
            json!({
                "model": "openai/gpt-oss-120b",
                "messages": [
                    {"role": "system", "content": "Be brief."},
                    {"role": "user", "content": "Hi"}
                ],
                "temperature": 0.5,
                "max_tokens": 2000
            })
        );
    }

    #[test]
    fn params_omit_unset_generation_options() {
        let params = ChatCompletionParams::new("m", vec![]);
        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains("temperature"));
        assert!(!json.contains("max_tokens"));
    }

    #[test]
    fn completion_first_text() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Hello!"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2}
        }))
        .unwrap();
        assert_eq!(completion.first_text(), Some("Hello!"));
    }

    #[test]
    fn completion_without_choices() {
        let completion: ChatCompletion = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert_eq!(completion.first_text(), None);

        let completion: ChatCompletion = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert_eq!(completion.first_text(), None);
    }

    #[test]
    fn error_response_deserialization() {
        let body: ApiErrorResponse = serde_json::from_value(json!({
            "error": {"message": "Invalid API Key", "type": "invalid_request_error", "code": "invalid_api_key"}
        }))
        .unwrap();
        assert_eq!(body.message(), Some("Invalid API Key"));
        assert_eq!(body.error_type(), Some("invalid_request_error"));

        let body: ApiErrorResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(body.message(), None);
    }
}
