// Middleware module - Axum middleware

pub mod auth;
pub mod cors;
pub mod logging;
pub mod monitor;
mod monitor_usage;
pub mod rate_limiter;
pub mod service_status;

pub use auth::{admin_auth_middleware, auth_middleware};
pub use cors::cors_layer;
pub use service_status::service_status_middleware;
