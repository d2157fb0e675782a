//! Gateway server — headless daemon.
//!
//! Loads configuration, wires the token pool, rate-limit registry, session
//! registry and model router into shared state, and serves the proxy's
//! OpenAI/Claude/Gemini endpoints. No CLI subcommands, no admin HTTP surface,
//! no embedded frontend — those are out of scope.

mod router;
mod server_utils;
mod state;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gateway_core::modules::{account, config as config_store};
use gateway_core::proxy::{ProxyMonitor, TokenManager};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config_store::load_config().map_err(|e| anyhow::anyhow!(e))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("gateway starting");

    gateway_core::proxy::metrics::install_recorder();

    let data_dir = account::get_data_dir().map_err(|e| anyhow::anyhow!(e))?;
    let token_manager = Arc::new(TokenManager::new(data_dir));
    let loaded = token_manager.load_accounts().await.map_err(|e| anyhow::anyhow!(e))?;
    info!(accounts = loaded, "loaded accounts from store");

    let monitor = Arc::new(ProxyMonitor::new());
    let proxy_config = config.proxy.clone();
    let state =
        AppState::new_with_components(token_manager, monitor, config.proxy, config.upstream_url)
            .await?;

    let app = router::build_router(state).await;

    let listener = server_utils::create_listener(proxy_config.port, &proxy_config)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    let bound_port = listener.local_addr().map(|a| a.port()).unwrap_or(proxy_config.port);
    info!(port = bound_port, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(server_utils::shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    info!("gateway stopped");
    Ok(())
}
