// OpenAI-compatible API handlers
// Split from monolithic openai.rs for maintainability

mod chat;
mod completions;
mod models;
mod responses_format;

pub use chat::handle_chat_completions;
pub use completions::handle_completions;
pub use models::handle_list_models;

use crate::proxy::retry::MAX_RETRY_ATTEMPTS;
