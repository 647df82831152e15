//! Relay server between the chat client and an OpenAI-compatible completion API.
//!
//! # Usage
//!
//! ```bash
//! # Key and port from the environment (or a .env file)
//! GROQ_API_KEY=gsk_... PORT=3001 chatrelay-server
//!
//! # Override the model and keep sessions for ten minutes of idleness
//! chatrelay-server --model llama-3.1-8b-instant --session-ttl-secs 600
//! ```

use arrrg::CommandLine;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatrelay::server::{ServerArgs, ServerConfig, run};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (args, _) = ServerArgs::from_command_line_relaxed("chatrelay-server [OPTIONS]");
    let config = ServerConfig::from_env()?.apply_args(args)?;
    let collector = biometrics::Collector::new();
    chatrelay::register_biometrics(collector);

    info!(
        port = config.port,
        api_key = if config.api_key.is_some() { "configured" } else { "missing" },
        "starting chat relay"
    );
    run(config).await?;
    Ok(())
}
