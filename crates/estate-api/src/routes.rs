//! Router assembly

use std::time::Duration;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::warn;

use estate_shared::config::ServerSettings;
use estate_shared::constants::API_V1_PREFIX;

use crate::dashboard;
use crate::handlers::{
    buildings, charges, costs, floors, funds, health, owners, reports, tenants, transactions, units,
};
use crate::state::AppState;

/// Every `/api/v1` resource router.
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/buildings", buildings::routes())
        .nest("/floors", floors::routes())
        .nest("/units", units::routes())
        .nest("/owners", owners::routes())
        .nest("/tenants", tenants::routes())
        .nest("/charges", charges::routes())
        .nest("/costs", costs::routes())
        .nest("/funds", funds::routes())
        .nest("/transactions", transactions::routes())
        .nest("/reports", reports::routes())
}

fn cors_layer(settings: &ServerSettings) -> CorsLayer {
    if settings.cors_allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = settings
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(TimeoutLayer::new(Duration::from_secs(settings.request_timeout_seconds)))
        .layer(cors_layer(&settings));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .nest(API_V1_PREFIX, api_routes())
        .merge(dashboard::routes())
        .nest_service("/static", ServeDir::new(&settings.static_dir))
        .with_state(state)
        .layer(middleware)
        .layer(DefaultBodyLimit::max(settings.body_limit_bytes))
}
