//! Core domain models for Antigravity Manager.
//!
//! This module contains all shared data structures used across the Antigravity ecosystem.

mod account;
mod config;
mod quota;
mod stats;
mod token;

// Re-export all models
pub use account::{Account, AccountIndex, AccountSummary};
pub use config::{
    ExperimentalConfig, GatewayConfig, ModelMappingsConfig, Protocol, ProviderConfig,
    ProviderDispatchMode, ProxyAuthMode, ProxyConfig, ProxyRotationStrategy,
    QuotaProtectionConfig, SchedulingMode, StickySessionConfig, UpstreamProxyConfig,
    UpstreamProxyMode,
};
pub use quota::{ModelQuota, QuotaData};
pub use stats::{ProxyRequestLog, ProxyStats};
pub use token::TokenData;
