//! # Gateway Core
//!
//! Core business logic for the multi-protocol LLM gateway: account pool
//! management, rate-limit tracking, session stickiness, model routing,
//! protocol mapping and the request dispatcher.

pub mod error;
pub mod modules;
pub mod proxy;
pub mod utils;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use gateway_types::models::{Account, GatewayConfig, TokenData};
