use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use gateway_core::proxy::middleware::cors::cors_layer;

/// Assemble the wire endpoints behind the auth-edge middleware (applied
/// inside `build_proxy_router`) plus the unauthenticated health/version
/// routes. No admin surface, no embedded frontend: both are out of scope.
pub async fn build_router(state: AppState) -> Router {
    let proxy_router = state.build_proxy_router().await;

    let public_routes = Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/version", get(version_info))
        .route("/metrics", get(metrics))
        .with_state(state);

    public_routes.merge(proxy_router).layer(TraceLayer::new_for_http()).layer(cors_layer())
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, axum::Json(serde_json::json!({"status": "ok"})))
}

async fn version_info() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({
            "version": option_env!("GIT_VERSION").unwrap_or("dev"),
            "build_time": option_env!("BUILD_TIME").unwrap_or("unknown"),
            "cargo_version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

async fn metrics() -> impl IntoResponse {
    gateway_core::proxy::metrics::render_metrics()
}
