use crate::proxy::TokenManager;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Axum application state
#[derive(Clone)]
pub struct AppState {
    pub token_manager: Arc<TokenManager>,
    pub custom_mapping: Arc<RwLock<std::collections::HashMap<String, String>>>,
    pub model_mappings: Arc<RwLock<gateway_types::models::ModelMappingsConfig>>,
    pub upstream_proxy: Arc<RwLock<gateway_types::models::UpstreamProxyConfig>>,
    pub security_config: Arc<RwLock<crate::proxy::ProxySecurityConfig>>,
    pub monitor: Arc<crate::proxy::monitor::ProxyMonitor>,
    pub experimental: Arc<RwLock<gateway_types::models::ExperimentalConfig>>,
    pub providers_anthropic: Arc<RwLock<gateway_types::models::ProviderConfig>>,
    pub request_timeout: u64,
    pub http_client: reqwest::Client,
    pub upstream: Arc<crate::proxy::upstream::client::UpstreamClient>,
}

/// Build proxy router with shared state references for hot-reload support.
///
/// Unlike `build_proxy_router`, this version accepts pre-created Arc references
/// so that external code can update the mapping at runtime. `upstream` is
/// accepted pre-built (rather than constructed here) so that callers holding
/// onto the same `Arc` can hot-reload its proxy pool in place.
#[allow(clippy::too_many_arguments, reason = "server bootstrap requires all subsystem references")]
pub fn build_proxy_router_with_shared_state(
    token_manager: Arc<TokenManager>,
    custom_mapping: Arc<RwLock<std::collections::HashMap<String, String>>>,
    model_mappings: Arc<RwLock<gateway_types::models::ModelMappingsConfig>>,
    upstream_proxy: Arc<RwLock<gateway_types::models::UpstreamProxyConfig>>,
    security_config: Arc<RwLock<crate::proxy::ProxySecurityConfig>>,
    monitor: Arc<crate::proxy::monitor::ProxyMonitor>,
    experimental: Arc<RwLock<gateway_types::models::ExperimentalConfig>>,
    providers_anthropic: Arc<RwLock<gateway_types::models::ProviderConfig>>,
    http_client: reqwest::Client,
    upstream: Arc<crate::proxy::upstream::client::UpstreamClient>,
) -> Router<()> {
    let state = AppState {
        token_manager,
        custom_mapping: Arc::clone(&custom_mapping),
        model_mappings: Arc::clone(&model_mappings),
        request_timeout: 300,
        http_client,
        upstream_proxy: Arc::clone(&upstream_proxy),
        upstream,
        monitor,
        experimental,
        providers_anthropic,
        security_config: Arc::clone(&security_config),
    };

    use crate::proxy::handlers;

    Router::new()
        // OpenAI Protocol
        .route("/v1/models", get(handlers::openai::handle_list_models))
        .route(
            "/v1/chat/completions",
            post(handlers::openai::handle_chat_completions),
        )
        .route(
            "/v1/completions",
            post(handlers::openai::handle_completions),
        )
        .route("/v1/responses", post(handlers::openai::handle_completions))
        // Claude Protocol
        .route("/v1/messages", post(handlers::claude::handle_messages))
        .route(
            "/v1/messages/count_tokens",
            post(handlers::claude::handle_count_tokens),
        )
        .route(
            "/v1/models/claude",
            get(handlers::claude::handle_list_models),
        )
        // Tool-call bridge
        .route("/mcp/messages", post(handlers::mcp::handle_mcp_messages))
        // Gemini Protocol
        .route("/v1beta/models", get(handlers::gemini::handle_list_models))
        .route(
            "/v1beta/models/:model",
            get(handlers::gemini::handle_get_model).post(handlers::gemini::handle_generate),
        )
        .route(
            "/v1beta/models/:model/countTokens",
            post(handlers::gemini::handle_count_tokens),
        )
        // Utility
        .route(
            "/v1/models/detect",
            post(handlers::detect_model::handle_detect_model),
        )
        .route(
            "/v1/api/event_logging/batch",
            post(|| async { StatusCode::OK }),
        )
        .route("/v1/api/event_logging", post(|| async { StatusCode::OK }))
        .layer(axum::middleware::from_fn_with_state(
            security_config,
            crate::proxy::middleware::auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::proxy::middleware::monitor::monitor_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ===== API handlers (legacy code removed, handled by src/proxy/handlers/*) =====
/// Configuration for starting the Axum server
pub struct ServerStartConfig {
    pub host: String,
    pub port: u16,
    pub token_manager: Arc<TokenManager>,
    pub custom_mapping: std::collections::HashMap<String, String>,
    pub model_mappings: gateway_types::models::ModelMappingsConfig,
    pub upstream_proxy: gateway_types::models::UpstreamProxyConfig,
    pub security_config: crate::proxy::ProxySecurityConfig,
    pub monitor: Arc<crate::proxy::monitor::ProxyMonitor>,
    pub experimental: gateway_types::models::ExperimentalConfig,
    pub providers_anthropic: gateway_types::models::ProviderConfig,
}

/// Axum server instance
pub struct AxumServer {
    config: ServerStartConfig,
}

impl AxumServer {
    pub fn new(config: ServerStartConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        tracing::info!("Starting Axum server on {}", addr);

        let custom_mapping = Arc::new(RwLock::new(self.config.custom_mapping));
        let model_mappings = Arc::new(RwLock::new(self.config.model_mappings));
        let security_config = Arc::new(RwLock::new(self.config.security_config));
        let experimental = Arc::new(RwLock::new(self.config.experimental));
        let providers_anthropic = Arc::new(RwLock::new(self.config.providers_anthropic));
        let upstream_proxy = Arc::new(RwLock::new(self.config.upstream_proxy.clone()));

        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let upstream = Arc::new(crate::proxy::upstream::client::UpstreamClient::new(
            http_client.clone(),
            Arc::clone(&upstream_proxy),
            None,
        ));

        let app = build_proxy_router_with_shared_state(
            self.config.token_manager,
            custom_mapping,
            model_mappings,
            upstream_proxy,
            security_config,
            self.config.monitor,
            experimental,
            providers_anthropic,
            http_client,
            upstream,
        );

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
