//! Gateway configuration: a single JSON file under the data directory.

use gateway_types::models::GatewayConfig;
use std::sync::{OnceLock, RwLock};
use std::time::{Duration, Instant};

const CONFIG_FILE: &str = "config.json";

/// Load the gateway configuration: defaults, then the on-disk file if
/// present, then environment variable overrides, in ascending precedence.
pub fn load_config() -> Result<GatewayConfig, String> {
    let data_dir = super::account::get_data_dir()?;
    let config_path = data_dir.join(CONFIG_FILE);

    let mut config = if !config_path.exists() {
        let default_config = GatewayConfig::new();
        save_config(&default_config)?;
        default_config
    } else {
        let content = std::fs::read_to_string(&config_path).map_err(|e| format!("Failed to read config: {}", e))?;
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Overlay recognized environment variables onto a loaded config. Unset
/// variables leave the corresponding field untouched.
fn apply_env_overrides(config: &mut GatewayConfig) {
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        if !level.is_empty() {
            config.log_level = level;
        }
    }
    if let Ok(db_path) = std::env::var("DB_PATH") {
        if !db_path.is_empty() {
            config.db_path = Some(db_path);
        }
    }
    if let Ok(upstream_url) = std::env::var("ANTIGRAVITY_UPSTREAM_URL") {
        if !upstream_url.is_empty() {
            config.upstream_url = Some(upstream_url);
        }
    }
    if let Ok(port) = std::env::var("PORT") {
        if let Ok(port) = port.parse::<u16>() {
            config.proxy.port = port;
        }
    }
    if let Ok(host) = std::env::var("HOST") {
        config.proxy.allow_lan_access = host != "127.0.0.1" && host != "localhost";
    }
}

/// Save the gateway configuration to disk, atomically.
pub fn save_config(config: &GatewayConfig) -> Result<(), String> {
    let data_dir = super::account::get_data_dir()?;
    let config_path = data_dir.join(CONFIG_FILE);
    let temp_path = data_dir.join(format!("{}.tmp", CONFIG_FILE));

    let content = serde_json::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(&temp_path, &content).map_err(|e| format!("Failed to write temp config: {}", e))?;
    std::fs::rename(&temp_path, &config_path).map_err(|e| format!("Failed to save config: {}", e))?;

    invalidate_cache();
    Ok(())
}

/// Apply an in-place update and persist the result.
pub fn update_config<F>(updater: F) -> Result<GatewayConfig, String>
where
    F: FnOnce(&mut GatewayConfig),
{
    let mut config = load_config()?;
    updater(&mut config);
    save_config(&config)?;
    Ok(config)
}

struct CachedConfig {
    value: GatewayConfig,
    loaded_at: Instant,
}

fn cache() -> &'static RwLock<Option<CachedConfig>> {
    static CACHE: OnceLock<RwLock<Option<CachedConfig>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(None))
}

const CACHE_TTL: Duration = Duration::from_secs(5);

/// Like [`load_config`], but memoized for a few seconds. The token pool
/// manager consults `quota_protection` on every candidate it scores, so a
/// per-request disk read would otherwise dominate selection latency.
pub fn load_config_cached() -> Result<GatewayConfig, String> {
    if let Some(cached) = cache().read().map_err(|_| "config cache poisoned")?.as_ref() {
        if cached.loaded_at.elapsed() < CACHE_TTL {
            return Ok(cached.value.clone());
        }
    }

    let value = load_config()?;
    *cache().write().map_err(|_| "config cache poisoned")? =
        Some(CachedConfig { value: value.clone(), loaded_at: Instant::now() });
    Ok(value)
}

fn invalidate_cache() {
    if let Ok(mut guard) = cache().write() {
        *guard = None;
    }
}
