// Public modules
pub mod api;
pub mod chat_completion;
pub mod message;

// Re-exports
pub use api::{ChatReply, ChatRequest, ClearReply, ClearRequest, ErrorBody, HealthReply};
pub use chat_completion::{
    ApiErrorObject, ApiErrorResponse, ChatCompletion, ChatCompletionParams, Choice, ChoiceMessage,
};
pub use message::{Message, MessageRole, MessageRoleParseError};
