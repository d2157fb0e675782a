// OpenAI mapper module
// Handles OpenAI ↔ Gemini protocol conversion

pub mod collector;
pub mod models;
pub mod request;
pub mod streaming;

pub use collector::collect_openai_stream_to_json;
pub use models::*;
pub use request::*;
