//! Shared application state: the `Arc`-wrapped subsystems the proxy router
//! needs to dispatch a request.

use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::sync::RwLock;

use gateway_core::proxy::upstream::client::UpstreamClient;
use gateway_core::proxy::{
    build_proxy_router_with_shared_state, ProxyMonitor, ProxySecurityConfig, TokenManager,
};
use gateway_types::models::ProxyConfig;

#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub token_manager: Arc<TokenManager>,
    pub monitor: Arc<ProxyMonitor>,
    pub proxy_config: Arc<RwLock<ProxyConfig>>,
    pub custom_mapping: Arc<RwLock<std::collections::HashMap<String, String>>>,
    pub model_mappings: Arc<RwLock<gateway_types::models::ModelMappingsConfig>>,
    pub security_config: Arc<RwLock<ProxySecurityConfig>>,
    pub upstream_proxy: Arc<RwLock<gateway_types::models::UpstreamProxyConfig>>,
    pub experimental_config: Arc<RwLock<gateway_types::models::ExperimentalConfig>>,
    pub providers_anthropic: Arc<RwLock<gateway_types::models::ProviderConfig>>,
    pub upstream: Arc<UpstreamClient>,
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Wire the subsystems together: token pool, security/rate-limit config,
    /// monitor and upstream client. The caller is expected to have already
    /// populated `token_manager` via `load_accounts()` from the opaque store.
    pub async fn new_with_components(
        token_manager: Arc<TokenManager>,
        monitor: Arc<ProxyMonitor>,
        proxy_config: ProxyConfig,
        upstream_url: Option<String>,
    ) -> Result<Self> {
        let custom_mapping = Arc::new(RwLock::new(proxy_config.custom_mapping.clone()));
        let model_mappings = Arc::new(RwLock::new(proxy_config.model_mappings.clone()));
        let upstream_proxy = Arc::new(RwLock::new(proxy_config.upstream_proxy.clone()));
        let security_config = Arc::new(RwLock::new(ProxySecurityConfig::from(&proxy_config)));
        let experimental_config = Arc::new(RwLock::new(proxy_config.experimental.clone()));
        let providers_anthropic = Arc::new(RwLock::new(proxy_config.providers_anthropic.clone()));

        token_manager
            .set_scheduling_config(proxy_config.scheduling.clone())
            .await;

        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(proxy_config.request_timeout))
            .http2_keep_alive_interval(std::time::Duration::from_secs(25))
            .http2_keep_alive_timeout(std::time::Duration::from_secs(10))
            .http2_keep_alive_while_idle(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let upstream = Arc::new(UpstreamClient::new(
            http_client.clone(),
            Arc::clone(&upstream_proxy),
            upstream_url.map(|url| vec![url]),
        ));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                token_manager,
                monitor,
                proxy_config: Arc::new(RwLock::new(proxy_config)),
                custom_mapping,
                model_mappings,
                upstream_proxy,
                security_config,
                experimental_config,
                providers_anthropic,
                upstream,
                http_client,
            }),
        })
    }

    pub async fn build_proxy_router(&self) -> Router {
        build_proxy_router_with_shared_state(
            self.inner.token_manager.clone(),
            self.inner.custom_mapping.clone(),
            self.inner.model_mappings.clone(),
            Arc::clone(&self.inner.upstream_proxy),
            self.inner.security_config.clone(),
            self.inner.monitor.clone(),
            self.inner.experimental_config.clone(),
            self.inner.providers_anthropic.clone(),
            self.inner.http_client.clone(),
            self.inner.upstream.clone(),
        )
    }
}
