//! # Herald Core
//!
//! Shared foundation for the Herald bot: configuration, error taxonomy,
//! the deliverable content model, and the inbound event types that the
//! channel layer produces and the orchestrator consumes.

pub mod config;
pub mod content;
pub mod error;
pub mod types;

pub use config::HeraldConfig;
pub use content::Content;
pub use error::{HeraldError, Result};
pub use types::{Event, IncomingMessage, RecipientId};
