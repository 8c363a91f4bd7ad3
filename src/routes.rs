use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers::{self, AppState};

/// Request bodies above this are rejected before they reach a handler.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Builds the widget API router.
///
/// `/health` bypasses every limit. With `rate_limited` set, the API routes get a
/// per-IP governor; it needs the peer address, so the server must be started
/// with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn build_app(state: Arc<AppState>, rate_limited: bool) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route("/api/data", post(handlers::fetch_data))
        .route("/api/zipcode", post(handlers::zipcode))
        .route("/api/page", post(handlers::page))
        .route("/api/submit", post(handlers::submit))
        .route("/api/theme", get(handlers::theme))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    let api_routes = if rate_limited {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(state.config.rate_limit_per_second)
                .burst_size(state.config.rate_limit_burst)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
        );
        tracing::info!(
            "Rate limiting enabled: {} req/s per IP, burst of {}",
            state.config.rate_limit_per_second,
            state.config.rate_limit_burst
        );
        api_routes.layer(ServiceBuilder::new().layer(GovernorLayer {
            config: governor_conf,
        }))
    } else {
        api_routes
    };

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}
