// Gemini mapper module
// Handles v1internal wrap/unwrap

pub mod collector;
pub mod models;
pub mod wrapper;

#[cfg(test)]
mod wrapper_tests;

pub use collector::collect_stream_to_json;
pub use wrapper::*;
