//! Sticky session configuration.
//!
//! This module re-exports session config types from `gateway-types` via `gateway-shared`.

pub use gateway_types::models::{SchedulingMode, StickySessionConfig};
