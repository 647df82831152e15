use std::env;
use std::fmt;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{UPSTREAM_REQUESTS, UPSTREAM_REQUEST_DURATION, UPSTREAM_REQUEST_ERRORS};
use crate::types::{ApiErrorResponse, ChatCompletion, ChatCompletionParams, Message};

/// Environment variable holding the upstream credential.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Default OpenAI-compatible endpoint root.
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/";

/// Default model requested from the upstream API.
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default upper bound on generated tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The completion capability: given an ordered message list, produce one assistant reply.
#[async_trait::async_trait]
pub trait Completion: Send + Sync {
    /// Returns false when the capability cannot possibly succeed, e.g. no credential.
    fn is_configured(&self) -> bool {
        true
    }

    /// Runs one blocking completion over `messages` and returns the reply text.
    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// Client for an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct CompletionClient {
    api_key: Option<String>,
    client: ReqwestClient,
    base_url: Url,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl CompletionClient {
    /// Create a new client.
    ///
    /// A missing key is not an error here; every completion will fail with a configuration
    /// error until one is supplied.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client reading the key from the `GROQ_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(env::var(API_KEY_ENV).ok())
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::configuration(format!("Failed to build HTTP client: {}", e))
            })?;
        let base_url = parse_base_url(base_url.as_deref().unwrap_or(DEFAULT_API_URL))?;

        Ok(Self {
            api_key,
            client,
            base_url,
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            timeout,
        })
    }

    /// Sets the model to request.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
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

    /// Returns the model this client requests.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the endpoint root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns true if an API key is present.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::configuration(format!(
                "{API_KEY_ENV} not configured on server"
            )));
        };
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| Error::configuration("API key contains invalid header characters"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::connection(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };
        let parsed = serde_json::from_str::<ApiErrorResponse>(&body).unwrap_or_default();
        let message = parsed
            .message()
            .map(String::from)
            .unwrap_or_else(|| format!("upstream API error: {status_code}"));
        Error::upstream(
            Some(status_code),
            parsed.error_type().map(String::from),
            message,
        )
    }

    fn map_request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::connection(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Send a completion request and return the parsed response.
    pub async fn send(&self, params: &ChatCompletionParams) -> Result<ChatCompletion> {
        let url = self.base_url.join("chat/completions")?;
        let headers = self.default_headers()?;

        UPSTREAM_REQUESTS.click();
        let start = Instant::now();
        let result = self.send_inner(url, headers, params).await;
        UPSTREAM_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            UPSTREAM_REQUEST_ERRORS.click();
            warn!(model = %params.model, error = %err, "completion request failed");
        }
        result
    }

    async fn send_inner(
        &self,
        url: Url,
        headers: HeaderMap,
        params: &ChatCompletionParams,
    ) -> Result<ChatCompletion> {
        debug!(
            model = %params.model,
            messages = params.messages.len(),
            "sending completion request"
        );
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(params)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<ChatCompletion>().await.map_err(|e| {
            if e.is_timeout() {
                self.map_request_error(e)
            } else {
                Error::serialization(
                    format!("Failed to parse response: {}", e),
                    Some(Box::new(e)),
                )
            }
        })
    }
}

#[async_trait::async_trait]
impl Completion for CompletionClient {
    fn is_configured(&self) -> bool {
        self.has_api_key()
    }

    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let params = ChatCompletionParams::new(self.model.clone(), messages.to_vec())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        let completion = self.send(&params).await?;
        completion
            .first_text()
            .map(String::from)
            .ok_or_else(|| Error::serialization("upstream response contained no message", None))
    }
}

impl fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionClient")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Parses an endpoint root, making sure relative joins land underneath it.
fn parse_base_url(base_url: &str) -> Result<Url> {
    if base_url.ends_with('/') {
        Ok(Url::parse(base_url)?)
    } else {
        Ok(Url::parse(&format!("{base_url}/"))?)
    }
}
