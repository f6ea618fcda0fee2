//! # Herald Bot
//!
//! The operator-facing half of Herald: the per-operator conversation state
//! machine (compose → confirm/cancel), the command surface, and the
//! orchestrator that glues commands to the store, the dispatcher, and the
//! scheduled queue.

pub mod commands;
pub mod conversation;
pub mod orchestrator;

pub use commands::Command;
pub use conversation::{Accepted, ConversationStore, Flow, Step};
pub use orchestrator::Orchestrator;
