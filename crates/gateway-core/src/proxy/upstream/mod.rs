//! Upstream client module — talks to the Google Cloud Code `v1internal` backend.

pub mod client;
pub mod device_fingerprint;
pub mod endpoint_health;
pub mod retry;
pub mod user_agent;
