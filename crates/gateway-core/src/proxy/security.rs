//! Runtime-reloadable security slice of `ProxyConfig`, consumed by
//! [`crate::proxy::middleware::auth`].
//!
//! Kept separate from the full `ProxyConfig` so the auth middleware can hold
//! an `Arc<RwLock<ProxySecurityConfig>>` without needing to lock the entire
//! gateway config (model mappings, sticky-session settings, etc.) on every
//! request.

use gateway_types::models::{ProxyAuthMode, ProxyConfig};

/// The subset of `ProxyConfig` the auth edge needs to decide whether a
/// request may proceed.
#[derive(Debug, Clone, Default)]
pub struct ProxySecurityConfig {
    pub auth_mode: ProxyAuthMode,
    pub api_key: String,
}

impl ProxySecurityConfig {
    pub fn new(auth_mode: ProxyAuthMode, api_key: String) -> Self {
        Self { auth_mode, api_key }
    }

    /// Resolve `Auto` into a concrete mode based on whether an API key is
    /// configured: a key present implies `Strict`, absent implies `Off`.
    pub fn effective_auth_mode(&self) -> ProxyAuthMode {
        match self.auth_mode {
            ProxyAuthMode::Auto => {
                if self.api_key.is_empty() {
                    ProxyAuthMode::Off
                } else {
                    ProxyAuthMode::Strict
                }
            },
            other => other,
        }
    }
}

impl From<&ProxyConfig> for ProxySecurityConfig {
    fn from(config: &ProxyConfig) -> Self {
        Self { auth_mode: config.auth_mode.clone(), api_key: config.api_key.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_with_key_is_strict() {
        let cfg = ProxySecurityConfig::new(ProxyAuthMode::Auto, "secret".to_string());
        assert_eq!(cfg.effective_auth_mode(), ProxyAuthMode::Strict);
    }

    #[test]
    fn auto_without_key_is_off() {
        let cfg = ProxySecurityConfig::new(ProxyAuthMode::Auto, String::new());
        assert_eq!(cfg.effective_auth_mode(), ProxyAuthMode::Off);
    }

    #[test]
    fn explicit_modes_pass_through() {
        let cfg = ProxySecurityConfig::new(ProxyAuthMode::Strict, String::new());
        assert_eq!(cfg.effective_auth_mode(), ProxyAuthMode::Strict);
        let cfg = ProxySecurityConfig::new(ProxyAuthMode::AllExceptHealth, String::new());
        assert_eq!(cfg.effective_auth_mode(), ProxyAuthMode::AllExceptHealth);
    }
}
