//! HTTP surface of the relay.
//!
//! - POST /api/chat - run one turn
//! - POST /api/clear - forget a session
//! - GET /api/health - liveness check

mod config;
mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::client::CompletionClient;
use crate::conversation::Conversation;
use crate::error::{Error, Result};
use crate::store::{MemoryStore, SessionStore, spawn_sweeper};

pub use config::{DEFAULT_PORT, DEFAULT_SESSION_TTL, PORT_ENV, ServerArgs, ServerConfig};
pub use error::ApiError;
pub use handlers::HEALTH_MESSAGE;

#[derive(Clone)]
pub struct AppState {
    pub conversation: Arc<Conversation>,
}

impl AppState {
    pub fn new(conversation: Arc<Conversation>) -> Self {
        Self { conversation }
    }
}

/// Create the router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/chat", post(handlers::chat_handler))
        .route("/api/clear", post(handlers::clear_handler))
        .route("/api/health", get(handlers::health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Wires the store, completion client and conversation manager described by `config`.
///
/// The returned store is the one the conversation writes to, for callers that want to
/// sweep it.
pub fn build_conversation(config: &ServerConfig) -> Result<(Arc<Conversation>, Arc<MemoryStore>)> {
    let completion = CompletionClient::with_options(
        config.api_key.clone(),
        Some(config.base_url.clone()),
        None,
    )?
    .with_model(config.model.clone())
    .with_temperature(config.temperature)
    .with_max_tokens(config.max_tokens);

    let store = Arc::new(
        MemoryStore::new(config.system_prompt.clone()).with_idle_timeout(config.session_ttl),
    );
    let conversation = Conversation::with_config(
        Arc::clone(&store) as Arc<dyn SessionStore>,
        Arc::new(completion),
        config.conversation_config(),
    );
    Ok((Arc::new(conversation), store))
}

/// Run the HTTP server until it fails.
pub async fn run(config: ServerConfig) -> Result<()> {
    let (conversation, store) = build_conversation(&config)?;
    if !conversation.is_configured() {
        warn!("GROQ_API_KEY is not set; chat requests will fail until it is");
    }
    let sweeper = config.session_ttl.map(|ttl| spawn_sweeper(store, sweep_interval(ttl)));

    let app = create_router(AppState::new(conversation));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        Error::configuration(format!("failed to bind {addr}: {e}"))
    })?;
    info!(%addr, model = %config.model, "chat relay listening");
    info!("API endpoint: http://localhost:{}/api/chat", config.port);

    let served = axum::serve(listener, app).await;
    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    served.map_err(|e| Error::transport(format!("server failed: {e}"), Some(Box::new(e))))
}

/// Sweeps often enough that an idle session outlives its ttl by at most a minute.
fn sweep_interval(ttl: std::time::Duration) -> std::time::Duration {
    ttl.min(std::time::Duration::from_secs(60))
}
