mod content_builder;
mod generation_config;
mod google_content;
pub mod image_retention;
mod message_cleaning;
mod model_compat;
mod monolith;
pub mod signature_validator;
mod system_instruction;
mod thinking;
mod tool_result_handler;
mod tools_builder;

/// Minimum thought-signature length accepted as genuine (vs. a throwaway/dummy value).
pub const MIN_SIGNATURE_LENGTH: usize = 50;

pub use message_cleaning::{
    clean_cache_control_from_messages, merge_consecutive_messages, sort_thinking_blocks_first,
};
pub use model_compat::clean_thinking_fields_recursive;
pub use monolith::transform_claude_request_in;
pub use signature_validator::DUMMY_SIGNATURE;
