use std::net::SocketAddr;
use std::sync::Arc;

use rust_prequal_api::config::Config;
use rust_prequal_api::handlers::AppState;
use rust_prequal_api::{obs, routes};

/// Main entry point for the widget API server.
///
/// Initializes tracing, loads configuration, wires the upstream clients and
/// the template store into the shared state, then serves the router.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    obs::init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    let port = config.port;

    // Build application state
    let app_state = Arc::new(AppState::from_config(config)?);
    tracing::info!("✓ Upstream clients and templates initialized");

    let app = routes::build_app(app_state, true)?;

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
