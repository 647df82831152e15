//! Configuration for the relay server.
//!
//! Values come from three layers, later ones winning: built-in defaults, the environment
//! (`PORT`, `GROQ_API_KEY`), and the command line.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::{API_KEY_ENV, DEFAULT_API_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::conversation::{
    ConversationConfig, DEFAULT_MAX_HISTORY, DEFAULT_SYSTEM_PROMPT, DEFAULT_TURN_TIMEOUT,
};
use crate::error::{Error, Result};

/// Environment variable naming the listen port.
pub const PORT_ENV: &str = "PORT";

/// Port used when neither the environment nor the command line names one.
pub const DEFAULT_PORT: u16 = 3001;

/// Default idle time after which a session is forgotten.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Command-line arguments for the chatrelay-server binary.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ServerArgs {
    #[arrrg(optional, "Port to listen on (default: $PORT or 3001)", "PORT")]
    pub port: Option<u16>,

    #[arrrg(optional, "Model to request (default: openai/gpt-oss-120b)", "MODEL")]
    pub model: Option<String>,

    #[arrrg(optional, "Completion API root (default: https://api.groq.com/openai/v1/)", "URL")]
    pub base_url: Option<String>,

    /// Text, because `CommandLine` requires `Eq`.  Parsed by [`ServerConfig::apply_args`].
    #[arrrg(optional, "Sampling temperature (default: 0.7)", "TEMP")]
    pub temperature: Option<String>,

    #[arrrg(optional, "Max tokens per reply (default: 2000)", "TOKENS")]
    pub max_tokens: Option<u32>,

    #[arrrg(optional, "Messages kept per session (default: 20)", "N")]
    pub max_history: Option<usize>,

    #[arrrg(optional, "Seconds to wait for a completion, 0 to wait forever (default: 60)", "SECS")]
    pub timeout_secs: Option<u64>,

    #[arrrg(optional, "Seconds before an idle session is forgotten, 0 to keep forever (default: 3600)", "SECS")]
    pub session_ttl_secs: Option<u64>,

    #[arrrg(flag, "Let turns for the same session run concurrently")]
    pub allow_concurrent_turns: bool,
}

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    pub max_history: usize,
    pub turn_timeout: Option<Duration>,
    pub session_ttl: Option<Duration>,
    pub serialize_turns: bool,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self {
            port: DEFAULT_PORT,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_API_URL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            max_history: DEFAULT_MAX_HISTORY,
            turn_timeout: Some(DEFAULT_TURN_TIMEOUT),
            session_ttl: Some(DEFAULT_SESSION_TTL),
            serialize_turns: true,
        }
    }

    /// Defaults overlaid with `PORT` and `GROQ_API_KEY` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values produced by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::new();
        if let Some(port) = lookup(PORT_ENV).filter(|p| !p.trim().is_empty()) {
            config.port = port.trim().parse().map_err(|_| {
                Error::configuration(format!("{PORT_ENV} is not a valid port: {port}"))
            })?;
        }
        config.api_key = lookup(API_KEY_ENV).filter(|key| !key.trim().is_empty());
        Ok(config)
    }

    /// Overlays command-line arguments.
    pub fn apply_args(mut self, args: ServerArgs) -> Result<Self> {
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(model) = args.model {
            self.model = model;
        }
        if let Some(base_url) = args.base_url {
            self.base_url = base_url;
        }
        if let Some(temperature) = args.temperature {
            let value = temperature.trim().parse::<f32>().map_err(|_| {
                Error::invalid_input(
                    format!("temperature must be a number: {temperature}"),
                    Some("temperature".to_string()),
                )
            })?;
            self.temperature = Some(value);
        }
        if let Some(max_tokens) = args.max_tokens {
            self.max_tokens = Some(max_tokens);
        }
        if let Some(max_history) = args.max_history {
            if max_history == 0 {
                return Err(Error::invalid_input(
                    "max history must be at least 1",
                    Some("max_history".to_string()),
                ));
            }
            self.max_history = max_history;
        }
        if let Some(secs) = args.timeout_secs {
            self.turn_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(secs) = args.session_ttl_secs {
            self.session_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if args.allow_concurrent_turns {
            self.serialize_turns = false;
        }
        Ok(self)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    pub fn with_session_ttl(mut self, session_ttl: Option<Duration>) -> Self {
        self.session_ttl = session_ttl;
        self
    }

    /// The turn protocol settings derived from this configuration.
    pub fn conversation_config(&self) -> ConversationConfig {
        ConversationConfig::new()
            .with_max_history(self.max_history)
            .with_turn_timeout(self.turn_timeout)
            .with_serialized_turns(self.serialize_turns)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
