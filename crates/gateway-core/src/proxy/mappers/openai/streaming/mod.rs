mod candidate_processor;
mod codex_stream;
mod function_call_handler;
mod legacy_stream;
mod openai_stream;
mod ssop_detector;
mod stream_formatters;
mod usage;

pub use codex_stream::create_codex_sse_stream;
pub use legacy_stream::create_legacy_sse_stream;
pub use openai_stream::create_openai_sse_stream;
pub use usage::extract_usage_metadata;

#[allow(deprecated)]
pub use crate::proxy::mappers::signature_store::{get_thought_signature, store_thought_signature};
