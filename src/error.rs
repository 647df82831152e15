//! Error types for chatrelay.
//!
//! Every failure a turn can hit is folded into one [`Error`] type.  Each variant belongs to
//! exactly one [`ErrorKind`], which is what the HTTP layer and the chat client use to decide
//! how a failure is surfaced.

use std::error;
use std::fmt;
use std::sync::Arc;

/// The taxonomy bucket an [`Error`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller supplied unusable input.  No state was mutated.
    InvalidInput,
    /// The completion capability is not configured.  No state was mutated.
    Configuration,
    /// The completion capability failed or returned something unusable.
    Upstream,
    /// The chat client could not reach the backend, or the backend refused the turn.
    Transport,
}

/// The main error type for chatrelay.
#[derive(Clone, Debug)]
pub enum Error {
    /// Empty or otherwise unusable input.
    InvalidInput {
        /// Human-readable error message.
        message: String,
        /// Parameter that caused the error.
        param: Option<String>,
    },

    /// The completion capability is missing required configuration.
    Configuration {
        /// Human-readable error message.
        message: String,
    },

    /// The completion API answered with a non-success status.
    Upstream {
        /// HTTP status code, when one was received.
        status_code: Option<u16>,
        /// Error type string from the API.
        error_type: Option<String>,
        /// Human-readable error message.
        message: String,
    },

    /// The completion call did not finish in time.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// The completion API could not be reached.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The completion API returned a payload we could not interpret.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The chat client could not reach the backend.
    Transport {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The backend answered the chat client with an error body.
    Backend {
        /// HTTP status code returned by the backend.
        status_code: u16,
        /// The `error` field of the response body.
        message: String,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },
}

impl Error {
    /// Creates a new invalid input error.
    pub fn invalid_input(message: impl Into<String>, param: Option<String>) -> Self {
        Error::InvalidInput {
            message: message.into(),
            param,
        }
    }

    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new upstream error.
    pub fn upstream(
        status_code: Option<u16>,
        error_type: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Upstream {
            status_code,
            error_type,
            message: message.into(),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new transport error.
    pub fn transport(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Transport {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new backend error.
    pub fn backend(status_code: u16, message: impl Into<String>) -> Self {
        Error::Backend {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Returns the taxonomy bucket for this error.
    ///
    /// URL errors only arise while building a client, so they count as configuration.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput { .. } => ErrorKind::InvalidInput,
            Error::Configuration { .. } | Error::Url { .. } => ErrorKind::Configuration,
            Error::Upstream { .. }
            | Error::Timeout { .. }
            | Error::Connection { .. }
            | Error::Serialization { .. } => ErrorKind::Upstream,
            Error::Transport { .. } | Error::Backend { .. } => ErrorKind::Transport,
        }
    }

    /// Returns true if this error was caused by caller input.
    pub fn is_invalid_input(&self) -> bool {
        self.kind() == ErrorKind::InvalidInput
    }

    /// Returns true if this error is a configuration problem.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Returns true if this error came from the completion capability.
    pub fn is_upstream(&self) -> bool {
        self.kind() == ErrorKind::Upstream
    }

    /// Returns true if this error happened between the chat client and the backend.
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Upstream { status_code, .. } => *status_code,
            Error::Backend { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Returns the bare human-readable message, without the category prefix that `Display`
    /// adds.
    pub fn message(&self) -> &str {
        match self {
            Error::InvalidInput { message, .. }
            | Error::Configuration { message }
            | Error::Upstream { message, .. }
            | Error::Timeout { message, .. }
            | Error::Connection { message, .. }
            | Error::Serialization { message, .. }
            | Error::Transport { message, .. }
            | Error::Backend { message, .. }
            | Error::Url { message, .. } => message,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput { message, param } => {
                if let Some(param) = param {
                    write!(f, "Invalid input: {message} (parameter: {param})")
                } else {
                    write!(f, "Invalid input: {message}")
                }
            }
            Error::Configuration { message } => {
                write!(f, "Configuration error: {message}")
            }
            Error::Upstream {
                status_code,
                error_type,
                message,
            } => match (error_type, status_code) {
                (Some(error_type), Some(status)) => {
                    write!(f, "{error_type}: {message} (status {status})")
                }
                (Some(error_type), None) => write!(f, "{error_type}: {message}"),
                (None, Some(status)) => write!(f, "Upstream error: {message} (status {status})"),
                (None, None) => write!(f, "Upstream error: {message}"),
            },
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::Transport { message, .. } => {
                write!(f, "Transport error: {message}")
            }
            Error::Backend {
                status_code,
                message,
            } => {
                write!(f, "Backend error: {message} (status {status_code})")
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::Serialization { source, .. }
            | Error::Transport { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for chatrelay operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            Error::invalid_input("Message is required", None).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            Error::configuration("no key").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::upstream(Some(503), None, "overloaded").kind(),
            ErrorKind::Upstream
        );
        assert_eq!(Error::timeout("slow", Some(1.0)).kind(), ErrorKind::Upstream);
        assert_eq!(Error::connection("refused", None).kind(), ErrorKind::Upstream);
        assert_eq!(Error::serialization("bad", None).kind(), ErrorKind::Upstream);
        assert_eq!(Error::transport("offline", None).kind(), ErrorKind::Transport);
        assert_eq!(Error::backend(500, "boom").kind(), ErrorKind::Transport);
    }

    #[test]
    fn message_has_no_prefix() {
        let err = Error::upstream(Some(401), Some("invalid_api_key".to_string()), "Invalid API Key");
        assert_eq!(err.message(), "Invalid API Key");
        assert_eq!(err.to_string(), "invalid_api_key: Invalid API Key (status 401)");
        assert_eq!(err.status_code(), Some(401));
    }

    #[test]
    fn display_variants() {
        assert_eq!(
            Error::invalid_input("Message is required", Some("message".to_string())).to_string(),
            "Invalid input: Message is required (parameter: message)"
        );
        assert_eq!(
            Error::timeout("completion timed out", Some(2.5)).to_string(),
            "Timeout error: completion timed out (2.5 seconds)"
        );
        assert_eq!(
            Error::backend(500, "boom").to_string(),
            "Backend error: boom (status 500)"
        );
    }

    #[test]
    fn json_errors_are_upstream() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(err.is_upstream());
        assert!(error::Error::source(&err).is_some());
    }
}
