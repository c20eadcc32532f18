// src/officellm/mod.rs

pub mod call_stack;
pub mod config;
pub mod event;
pub mod movement;
pub mod navigation;
pub mod orchestrator;
pub mod session;
pub mod space;
pub mod stream_mux;

// Let's explicitly export the two entry points so callers don't have to
// reach through the module path.
pub use orchestrator::Orchestrator;
pub use session::ConversationSession;
