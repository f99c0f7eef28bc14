mod api_doc;
mod config;
mod envelope;
mod error;
mod handlers;
mod http;
mod models;
mod router;
mod routes;
mod spanner;
mod state;
mod store;

use anyhow::Context;
use config::{Config, StoreBackend};
use envelope::RouterRequest;
use spanner::SpannerClient;
use state::AppState;
use std::io::Read;
use std::sync::Arc;
use store::{ItemStore, MemoryStore};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    // `openapi` prints the API document and exits without touching the store
    let command = std::env::args().nth(1);
    if command.as_deref() == Some("openapi") {
        println!("{}", api_doc::ApiDoc::openapi().to_pretty_json()?);
        return Ok(());
    }

    tracing::info!("rust-spanner-items starting");

    let config = Config::from_env()?;
    config.log_startup();

    let store: Arc<dyn ItemStore> = match &config.store_backend {
        StoreBackend::Spanner(spanner) => {
            Arc::new(SpannerClient::from_config(spanner, &config.table_name).await?)
        }
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };

    let addr = format!("{}:{}", config.service_host, config.service_port);
    let state = AppState::new(store, config);

    // `invoke` routes one proxy event from stdin and prints the response
    if command.as_deref() == Some("invoke") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read event from stdin")?;
        let request: RouterRequest =
            serde_json::from_str(&input).context("Event is not a valid proxy request")?;
        let response = router::dispatch(&state, &request).await;
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, http::create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
