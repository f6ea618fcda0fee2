//! Inbound event types shared between the channel layer and the orchestrator.

use serde::{Deserialize, Serialize};

use crate::content::Content;

/// Opaque identifier of an addressable recipient (a Telegram chat id).
/// Uniqueness is owned by the recipient directory, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecipientId(pub i64);

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for RecipientId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// One inbound message from an operator or user.
///
/// `text` carries the raw text for command parsing; `content` is the same
/// message materialized as a deliverable, when one can be built from it.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub from: RecipientId,
    pub text: Option<String>,
    pub content: Option<Content>,
}

/// Channel events the orchestrator reacts to.
#[derive(Debug, Clone)]
pub enum Event {
    Message(IncomingMessage),
    /// A chat member left or blocked the bot; drop them from the directory.
    MemberLeft { recipient: RecipientId },
}
