//! Per-model tool schema adapters.

mod pencil;

pub use pencil::PencilAdapter;
