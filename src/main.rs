mod config;
mod error;
mod llm;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::ServerConfig::from_env();

    // Fatal: the advisor cannot do anything without a model credential.
    let llm = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            client
        }
        Err(e) => {
            tracing::error!(error = %e, "LLM client not configured");
            std::process::exit(1);
        }
    };

    let state = state::AppState::new(Arc::new(llm), config.preview_debounce);

    // Reclaim workspaces whose browser went away without deleting them.
    let _sweeper = services::sweeper::spawn_idle_sweeper(state.clone(), config.sweep);
    let app = routes::app(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    tracing::info!(%addr, debounce_ms = config.preview_debounce.as_millis(), "site-advisor listening");
    axum::serve(listener, app).await.expect("server failed");
}
