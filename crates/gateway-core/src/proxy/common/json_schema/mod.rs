mod cleaner;
mod merge;
mod recursive;
mod tool_fix;
mod union;

pub use cleaner::{clean_json_schema, clean_json_schema_for_tool};
pub use tool_fix::fix_tool_call_args;

#[cfg(test)]
mod tests;
