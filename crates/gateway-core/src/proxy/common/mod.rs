//! Common utilities shared across protocol handlers and the upstream client.

pub mod background_task;
pub mod client_builder;
pub mod header_constants;
pub mod json_schema;
pub mod media_detect;
pub mod model_family;
pub mod model_mapping;
pub mod model_mapping_ext;
pub mod random_id;
pub mod sanitize_error;
pub mod schema_cache;
pub mod sse_parser;
pub mod thinking_config;
pub mod thinking_constants;
pub mod tool_adapter;
pub mod tool_adapters;
pub mod tos_ban;
pub mod upstream_error;

pub use model_mapping_ext::{resolve_model_route, resolve_model_route_for_protocol};
pub use sanitize_error::{sanitize_exhaustion_error, sanitize_upstream_error};
pub use upstream_error::UpstreamError;
