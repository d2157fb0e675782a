//! Gateway and proxy configuration models.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use validator::Validate;

// ============================================================================
// Enums
// ============================================================================

/// Proxy authentication mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProxyAuthMode {
    /// No authentication required
    #[default]
    Off,
    /// Always require API key
    Strict,
    /// Require API key for all except health checks
    AllExceptHealth,
    /// Automatic mode (detect from request)
    Auto,
}

impl fmt::Display for ProxyAuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyAuthMode::Off => write!(f, "off"),
            ProxyAuthMode::Strict => write!(f, "strict"),
            ProxyAuthMode::AllExceptHealth => write!(f, "all_except_health"),
            ProxyAuthMode::Auto => write!(f, "auto"),
        }
    }
}

impl ProxyAuthMode {
    /// Parse from string.
    pub fn from_string(s: &str) -> Self {
        match s {
            "strict" => ProxyAuthMode::Strict,
            "all_except_health" => ProxyAuthMode::AllExceptHealth,
            "auto" => ProxyAuthMode::Auto,
            _ => ProxyAuthMode::Off,
        }
    }
}

/// Dispatch mode for the Anthropic passthrough provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderDispatchMode {
    /// Passthrough disabled, all Claude requests go through the Gemini-backed mappers
    #[default]
    Off,
    /// Route every `claude-*` request to the passthrough exclusively
    Always,
    /// Use the passthrough only after the Gemini-backed dispatcher exhausts retries
    Fallback,
}

impl fmt::Display for ProviderDispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderDispatchMode::Off => write!(f, "off"),
            ProviderDispatchMode::Always => write!(f, "always"),
            ProviderDispatchMode::Fallback => write!(f, "fallback"),
        }
    }
}

/// Wire protocol of an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Protocol {
    #[default]
    OpenAI,
    Anthropic,
    Gemini,
}

/// Account scheduling mode for sticky sessions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum SchedulingMode {
    /// Prioritize cache hits by keeping a session pinned to its account
    CacheFirst,
    /// Balance between cache affinity and load spreading
    #[default]
    Balance,
    /// Prioritize the least-loaded account regardless of session affinity
    PerformanceFirst,
}

impl fmt::Display for SchedulingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingMode::CacheFirst => write!(f, "CacheFirst"),
            SchedulingMode::Balance => write!(f, "Balance"),
            SchedulingMode::PerformanceFirst => write!(f, "PerformanceFirst"),
        }
    }
}

// ============================================================================
// Anthropic passthrough provider configuration
// ============================================================================

/// Configuration for the Anthropic-compatible passthrough provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
pub struct ProviderConfig {
    /// Enable the passthrough provider
    #[serde(default)]
    pub enabled: bool,
    /// Anthropic-compatible API base URL
    #[validate(url)]
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    /// API key for the upstream provider
    #[serde(default)]
    pub api_key: String,
    /// Request dispatch mode
    #[serde(default)]
    pub dispatch_mode: ProviderDispatchMode,
    /// Model name remapping applied before proxying
    #[serde(default)]
    pub model_mapping: HashMap<String, String>,
}

// ============================================================================
// Session & Experimental Config
// ============================================================================

/// Experimental feature flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
pub struct ExperimentalConfig {
    /// Enable cross-model consistency checks when remapping models
    #[serde(default = "default_true")]
    pub enable_cross_model_checks: bool,
    /// Recover broken tool-call loops by synthesizing closing messages instead of erroring
    #[serde(default = "default_true")]
    pub enable_tool_loop_recovery: bool,
    /// Scale reported usage counts against the model's context window
    #[serde(default)]
    pub enable_usage_scaling: bool,
}

/// Sticky session configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Validate)]
pub struct StickySessionConfig {
    /// Enable sticky sessions
    #[serde(default)]
    pub enabled: bool,
    /// Scheduling mode
    #[serde(default)]
    pub mode: SchedulingMode,
    /// Session TTL in seconds
    #[validate(range(min = 1))]
    #[serde(default = "default_sticky_ttl", alias = "max_wait_seconds")]
    pub ttl: u32,
}

/// Upstream proxy mode for outbound requests to the Cloud Code backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamProxyMode {
    /// Direct connection (no proxy)
    #[default]
    Direct,
    /// Use system proxy settings (HTTP_PROXY, HTTPS_PROXY, ALL_PROXY for SOCKS)
    System,
    /// Use custom proxy URL
    Custom,
    /// Rotate across a pool of proxy URLs
    Pool,
}

/// Strategy for picking a proxy out of the pool in `UpstreamProxyMode::Pool`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProxyRotationStrategy {
    /// Evenly distribute requests across all proxies
    #[default]
    RoundRobin,
    /// Randomly select a proxy for each request
    Random,
    /// Deterministically bind each account to a specific proxy (sticky)
    PerAccount,
}

/// Upstream proxy configuration for outbound requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct UpstreamProxyConfig {
    /// Proxy mode: direct, system, or custom
    #[serde(default)]
    pub mode: UpstreamProxyMode,
    /// Enable upstream proxy (legacy, kept for compatibility)
    #[serde(default)]
    pub enabled: bool,
    /// Custom proxy URL (e.g., socks5://127.0.0.1:1080 or http://vps:8045)
    /// Only used when mode is Custom
    #[serde(default)]
    pub url: String,
    /// Proxy URLs for pool rotation (used when mode is Pool). Supports
    /// `http://`, `https://`, and `socks5://` schemes.
    #[serde(default)]
    pub proxy_urls: Vec<String>,
    /// Rotation strategy applied when selecting from `proxy_urls`.
    #[serde(default)]
    pub rotation_strategy: ProxyRotationStrategy,
    /// Reject the request rather than fall back to a direct connection when
    /// no proxy URL is available for the account making it.
    #[serde(default)]
    pub enforce_proxy: bool,
}

impl Default for UpstreamProxyConfig {
    fn default() -> Self {
        Self {
            mode: UpstreamProxyMode::Direct,
            enabled: false,
            url: String::new(),
            proxy_urls: Vec::new(),
            rotation_strategy: ProxyRotationStrategy::default(),
            enforce_proxy: false,
        }
    }
}

// ============================================================================
// Main Configurations
// ============================================================================

/// Per-protocol model name mappings, layered between the user's custom
/// mapping and the router's built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
pub struct ModelMappingsConfig {
    /// Mappings applied only to requests arriving over the OpenAI protocol
    #[serde(default)]
    pub openai: HashMap<String, String>,
    /// Mappings applied only to requests arriving over the Claude (Anthropic) protocol
    #[serde(default)]
    pub anthropic: HashMap<String, String>,
}

/// The gateway's singleton proxy configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct ProxyConfig {
    /// Enable the proxy server
    pub enabled: bool,
    /// Allow LAN access (bind to 0.0.0.0)
    #[serde(default)]
    pub allow_lan_access: bool,
    /// Authentication mode
    #[serde(default)]
    pub auth_mode: ProxyAuthMode,
    /// Port to listen on
    #[validate(range(min = 1024, max = 65535))]
    pub port: u16,
    /// API key required at the proxy edge (empty disables enforcement)
    #[serde(default)]
    pub api_key: String,
    /// Custom model name remapping, keyed by requested model name (highest priority)
    #[serde(default)]
    pub custom_mapping: HashMap<String, String>,
    /// Protocol-specific model name remapping, tried after `custom_mapping`
    /// and before the router's built-in defaults
    #[serde(default)]
    #[validate(nested)]
    pub model_mappings: ModelMappingsConfig,
    /// Request timeout in seconds
    #[validate(range(min = 30, max = 3600))]
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Enable request logging to the monitor's ring buffer
    #[serde(default)]
    pub enable_logging: bool,
    /// Upstream proxy configuration
    #[serde(default)]
    #[validate(nested)]
    pub upstream_proxy: UpstreamProxyConfig,
    /// Anthropic passthrough provider configuration
    #[serde(default)]
    #[validate(nested)]
    pub providers_anthropic: ProviderConfig,
    /// Sticky session configuration
    #[serde(default)]
    #[validate(nested)]
    pub scheduling: StickySessionConfig,
    /// Experimental features
    #[serde(default)]
    #[validate(nested)]
    pub experimental: ExperimentalConfig,
    /// Fixed account mode: use this account for all requests.
    /// `None` = round-robin/tiered selection, `Some(account_id)` = always use this account.
    #[serde(default)]
    pub preferred_account_id: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_lan_access: false,
            auth_mode: ProxyAuthMode::default(),
            port: 8045,
            api_key: String::new(),
            custom_mapping: HashMap::new(),
            model_mappings: ModelMappingsConfig::default(),
            request_timeout: default_request_timeout(),
            enable_logging: true,
            upstream_proxy: UpstreamProxyConfig::default(),
            providers_anthropic: ProviderConfig::default(),
            scheduling: StickySessionConfig::default(),
            experimental: ExperimentalConfig::default(),
            preferred_account_id: None,
        }
    }
}

impl ProxyConfig {
    /// Get the bind address based on LAN access setting.
    pub fn get_bind_address(&self) -> String {
        if self.allow_lan_access {
            "0.0.0.0".to_string()
        } else {
            "127.0.0.1".to_string()
        }
    }

    /// Get the full bind socket address.
    pub fn get_socket_addr(&self) -> String {
        format!("{}:{}", self.get_bind_address(), self.port)
    }
}

/// Quota protection configuration.
///
/// Guards against draining an account's last slice of quota on a model:
/// once a monitored model's remaining percentage drops to or below the
/// threshold, the model is marked protected on that account and the
/// selector skips it (see the token pool manager).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct QuotaProtectionConfig {
    /// Enable quota protection
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Threshold percentage (1-99) below which a model is protected
    #[validate(range(min = 1_u8, max = 99_u8))]
    #[serde(default = "default_quota_threshold")]
    pub threshold_percentage: u8,
    /// Models to monitor for quota protection; empty means none are monitored
    #[serde(default)]
    pub monitored_models: Vec<String>,
    /// Auto-restore a protected model once its quota recovers above threshold
    #[serde(default = "default_true")]
    pub auto_restore: bool,
}

fn default_true() -> bool {
    true
}

fn default_quota_threshold() -> u8 {
    5
}

impl Default for QuotaProtectionConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            threshold_percentage: default_quota_threshold(),
            monitored_models: Vec::new(),
            auto_restore: default_true(),
        }
    }
}

/// Root configuration loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. "info" or "gateway_core=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Path to the account store JSON file
    #[serde(default)]
    pub db_path: Option<String>,
    /// Override for the Cloud Code upstream base URL (defaults to the built-in list)
    #[serde(default)]
    pub upstream_url: Option<String>,
    /// Proxy configuration
    #[serde(default)]
    pub proxy: ProxyConfig,
    /// Quota protection configuration
    #[serde(default)]
    pub quota_protection: QuotaProtectionConfig,
}

impl GatewayConfig {
    /// Create default configuration.
    pub fn new() -> Self {
        Self {
            log_level: default_log_level(),
            db_path: None,
            upstream_url: None,
            proxy: ProxyConfig::default(),
            quota_protection: QuotaProtectionConfig::default(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Default Value Functions
// ============================================================================

fn default_provider_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_sticky_ttl() -> u32 {
    300 // 5 minutes default TTL for sticky sessions
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bind_address_is_loopback() {
        let config = ProxyConfig::default();
        assert_eq!(config.get_bind_address(), "127.0.0.1");
    }

    #[test]
    fn lan_access_binds_all_interfaces() {
        let mut config = ProxyConfig::default();
        config.allow_lan_access = true;
        assert_eq!(config.get_bind_address(), "0.0.0.0");
    }

    #[test]
    fn auth_mode_round_trips_through_string() {
        assert_eq!(ProxyAuthMode::from_string("strict"), ProxyAuthMode::Strict);
        assert_eq!(ProxyAuthMode::from_string("unknown"), ProxyAuthMode::Off);
    }
}
