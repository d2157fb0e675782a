mod function_call_processor;
mod part_processor;
#[cfg(test)]
mod signature_e2e_tests;
mod signature_manager;
mod state;
mod state_events;
mod state_finish;
#[cfg(test)]
mod streaming_tests;
mod tool_remapping;

pub use part_processor::PartProcessor;
pub use signature_manager::SignatureManager;
pub use state::*;
pub use tool_remapping::remap_function_call_args;
