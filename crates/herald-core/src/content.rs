//! Deliverable content model — a tagged union of text and media kinds.
//!
//! Construction validates the kind invariants (text must be non-empty, every
//! media kind needs a media ref) so the send paths never re-check them.
//! A `Content` value is immutable once built.

use serde::{Deserialize, Serialize};

use crate::error::{HeraldError, Result};

/// A single deliverable message: plain text or one media kind.
///
/// `media_ref` is the opaque Telegram `file_id`; captions ride along for
/// every media kind except stickers, which the Bot API sends caption-less.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
    Photo { media_ref: String, caption: Option<String> },
    Document { media_ref: String, caption: Option<String> },
    Video { media_ref: String, caption: Option<String> },
    Voice { media_ref: String, caption: Option<String> },
    Sticker { media_ref: String },
}

impl Content {
    /// Build a text message. Fails on empty or whitespace-only text.
    pub fn text(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(HeraldError::Content("text message is empty".into()));
        }
        Ok(Self::Text { text })
    }

    /// Rebuild a content value from its persisted parts.
    ///
    /// This is the single decode point for the queue record shape
    /// `{ kind, text, media_ref, caption }` — an unknown kind or a missing
    /// required field is rejected here, not at send time.
    pub fn from_parts(
        kind: &str,
        text: Option<&str>,
        media_ref: Option<&str>,
        caption: Option<&str>,
    ) -> Result<Self> {
        let require_ref = || {
            media_ref
                .map(str::to_string)
                .ok_or_else(|| HeraldError::Content(format!("{kind} content without media ref")))
        };
        let caption = caption.map(str::to_string);

        match kind {
            "text" => Self::text(text.unwrap_or_default()),
            "photo" => Ok(Self::Photo { media_ref: require_ref()?, caption }),
            "document" => Ok(Self::Document { media_ref: require_ref()?, caption }),
            "video" => Ok(Self::Video { media_ref: require_ref()?, caption }),
            "voice" => Ok(Self::Voice { media_ref: require_ref()?, caption }),
            "sticker" => Ok(Self::Sticker { media_ref: require_ref()? }),
            other => Err(HeraldError::Content(format!("unknown content kind '{other}'"))),
        }
    }

    /// Kind discriminant as stored in the queue table.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Photo { .. } => "photo",
            Self::Document { .. } => "document",
            Self::Video { .. } => "video",
            Self::Voice { .. } => "voice",
            Self::Sticker { .. } => "sticker",
        }
    }

    pub fn text_part(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn media_ref(&self) -> Option<&str> {
        match self {
            Self::Text { .. } => None,
            Self::Photo { media_ref, .. }
            | Self::Document { media_ref, .. }
            | Self::Video { media_ref, .. }
            | Self::Voice { media_ref, .. }
            | Self::Sticker { media_ref } => Some(media_ref),
        }
    }

    pub fn caption(&self) -> Option<&str> {
        match self {
            Self::Photo { caption, .. }
            | Self::Document { caption, .. }
            | Self::Video { caption, .. }
            | Self::Voice { caption, .. } => caption.as_deref(),
            Self::Text { .. } | Self::Sticker { .. } => None,
        }
    }

    /// Re-check the construction invariants.
    ///
    /// Constructors uphold them, but values can also arrive through serde or
    /// a hand-edited database row. The dispatcher runs this once before the
    /// first batch so a malformed value fails the whole call instead of
    /// failing per recipient.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Text { text } if text.trim().is_empty() => {
                Err(HeraldError::Content("text message is empty".into()))
            }
            Self::Photo { media_ref, .. }
            | Self::Document { media_ref, .. }
            | Self::Video { media_ref, .. }
            | Self::Voice { media_ref, .. }
            | Self::Sticker { media_ref }
                if media_ref.is_empty() =>
            {
                Err(HeraldError::Content(format!("{} content without media ref", self.kind())))
            }
            _ => Ok(()),
        }
    }
}
