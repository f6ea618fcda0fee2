//! # Herald Telegram
//!
//! Telegram Bot API channel: long polling for inbound updates and one send
//! method per content kind outbound. This crate is the concrete transport
//! behind the dispatcher's delivery seam.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};

use herald_core::config::TelegramConfig;
use herald_core::{Content, Event, HeraldError, IncomingMessage, RecipientId, Result};
use herald_dispatch::Transport;

/// Telegram Bot API client. Cheap to clone (shares the reqwest pool).
#[derive(Clone)]
pub struct TelegramApi {
    token: String,
    poll_timeout_secs: u64,
    client: reqwest::Client,
}

impl TelegramApi {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            token: config.bot_token.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.token, method)
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| HeraldError::Channel(format!("{method} failed: {e}")))?;
        let api: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| HeraldError::Channel(format!("Invalid {method} response: {e}")))?;
        if !api.ok {
            return Err(HeraldError::Channel(format!(
                "{method} error: {}",
                api.description.unwrap_or_default()
            )));
        }
        api.result
            .ok_or_else(|| HeraldError::Channel(format!("{method} returned no result")))
    }

    /// Identify the bot. Called once at startup; failure is fatal there.
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", serde_json::json!({})).await
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            serde_json::json!({
                "offset": offset,
                "timeout": self.poll_timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    /// Send one content variant to one chat — the exhaustive kind dispatch.
    pub async fn send_content(&self, chat_id: i64, content: &Content) -> Result<()> {
        let (method, body) = match content {
            Content::Text { text } => (
                "sendMessage",
                serde_json::json!({ "chat_id": chat_id, "text": text }),
            ),
            Content::Photo { media_ref, caption } => (
                "sendPhoto",
                serde_json::json!({ "chat_id": chat_id, "photo": media_ref, "caption": caption }),
            ),
            Content::Document { media_ref, caption } => (
                "sendDocument",
                serde_json::json!({ "chat_id": chat_id, "document": media_ref, "caption": caption }),
            ),
            Content::Video { media_ref, caption } => (
                "sendVideo",
                serde_json::json!({ "chat_id": chat_id, "video": media_ref, "caption": caption }),
            ),
            Content::Voice { media_ref, caption } => (
                "sendVoice",
                serde_json::json!({ "chat_id": chat_id, "voice": media_ref, "caption": caption }),
            ),
            Content::Sticker { media_ref } => (
                "sendSticker",
                serde_json::json!({ "chat_id": chat_id, "sticker": media_ref }),
            ),
        };
        let _: serde_json::Value = self.call(method, body).await?;
        Ok(())
    }

    /// Spawn the long-polling loop; events arrive on the returned stream.
    pub fn start_polling(&self) -> PollingStream {
        let api = self.clone();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut offset = 0i64;
            tracing::info!("📡 Telegram polling loop started");
            loop {
                match api.get_updates(offset).await {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            if let Some(event) = update.into_event()
                                && tx.send(event).is_err()
                            {
                                tracing::info!("Polling stopped (receiver dropped)");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Polling error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                }
            }
        });

        PollingStream { rx }
    }
}

#[async_trait]
impl Transport for TelegramApi {
    async fn deliver(&self, recipient: RecipientId, content: &Content) -> Result<()> {
        self.send_content(recipient.0, content).await
    }
}

/// Stream of inbound events produced by the polling loop.
pub struct PollingStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<Event>,
}

impl Stream for PollingStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Unpin for PollingStream {}

// --- Telegram API types ---

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub date: i64,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<PhotoSize>>,
    pub document: Option<FileRef>,
    pub video: Option<FileRef>,
    pub voice: Option<FileRef>,
    pub sticker: Option<FileRef>,
    pub left_chat_member: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    pub file_id: String,
}

impl Update {
    /// Convert an update into an orchestrator event. Bot-authored messages
    /// and updates carrying nothing usable map to `None`.
    pub fn into_event(self) -> Option<Event> {
        let msg = self.message?;

        if let Some(left) = &msg.left_chat_member {
            return Some(Event::MemberLeft { recipient: RecipientId(left.id) });
        }

        let from = msg.from.as_ref()?;
        if from.is_bot {
            return None;
        }

        let content = msg.to_content();
        if msg.text.is_none() && content.is_none() {
            return None;
        }
        Some(Event::Message(IncomingMessage {
            from: RecipientId(msg.chat.id),
            text: msg.text.clone(),
            content,
        }))
    }
}

impl Message {
    /// Materialize the message as deliverable content, when possible.
    /// Telegram lists photos in ascending resolution; the largest wins.
    fn to_content(&self) -> Option<Content> {
        let caption = self.caption.clone();
        if let Some(photo) = self.photo.as_ref().and_then(|sizes| sizes.last()) {
            return Some(Content::Photo { media_ref: photo.file_id.clone(), caption });
        }
        if let Some(doc) = &self.document {
            return Some(Content::Document { media_ref: doc.file_id.clone(), caption });
        }
        if let Some(video) = &self.video {
            return Some(Content::Video { media_ref: video.file_id.clone(), caption });
        }
        if let Some(voice) = &self.voice {
            return Some(Content::Voice { media_ref: voice.file_id.clone(), caption });
        }
        if let Some(sticker) = &self.sticker {
            return Some(Content::Sticker { media_ref: sticker.file_id.clone() });
        }
        self.text.as_deref().and_then(|t| Content::text(t).ok())
    }
}
