//! Command orchestration — routes operator commands to the conversation
//! store, the dispatcher, and the scheduled queue.
//!
//! Every conversation transition and dispatch completion produces exactly
//! one acknowledgment back to the initiating operator. Recipient-level
//! failures only ever surface as aggregate counts.

use std::sync::Arc;

use herald_core::{Content, Event, IncomingMessage, RecipientId, Result};
use herald_dispatch::{Dispatcher, Transport};
use herald_store::Store;

use crate::commands::Command;
use crate::conversation::{Accepted, ConversationStore, Flow};

const ADMIN_PANEL: &str = "Admin panel:\n\
    /stats - total recipient count\n\
    /addadmin <id> - grant admin (main admin only)\n\
    /removeadmin <id> - revoke admin (main admin only)\n\
    /broadcast - broadcast a message now\n\
    /schedule - queue a message for the daily send";

pub struct Orchestrator<T: Transport> {
    store: Arc<Store>,
    transport: Arc<T>,
    dispatcher: Dispatcher,
    conversations: ConversationStore,
    main_admin: RecipientId,
    welcome: String,
}

impl<T: Transport> Orchestrator<T> {
    pub fn new(
        store: Arc<Store>,
        transport: Arc<T>,
        dispatcher: Dispatcher,
        main_admin: RecipientId,
        welcome: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            dispatcher,
            conversations: ConversationStore::new(),
            main_admin,
            welcome: welcome.into(),
        }
    }

    pub async fn handle(&self, event: Event) -> Result<()> {
        match event {
            Event::MemberLeft { recipient } => {
                self.store.remove_recipient(recipient)?;
                tracing::info!("👋 Recipient {recipient} removed (left chat)");
                Ok(())
            }
            Event::Message(msg) => self.handle_message(msg).await,
        }
    }

    async fn handle_message(&self, msg: IncomingMessage) -> Result<()> {
        if let Some(text) = msg.text.as_deref()
            && let Some(command) = Command::parse(text)
        {
            return self.handle_command(msg.from, command).await;
        }
        self.handle_free_message(msg.from, msg.content).await
    }

    async fn handle_command(&self, from: RecipientId, command: Command) -> Result<()> {
        match command {
            Command::Start => {
                self.store.register_recipient(from)?;
                tracing::info!("👤 Recipient {from} registered");
                let welcome = self.welcome.clone();
                self.ack(from, &welcome).await
            }
            Command::Admin => {
                if !self.authorize(from).await? {
                    return Ok(());
                }
                self.ack(from, ADMIN_PANEL).await
            }
            Command::Stats => {
                if !self.authorize(from).await? {
                    return Ok(());
                }
                let count = self.store.recipient_count()?;
                self.ack(from, &format!("Total registered recipients: {count}")).await
            }
            Command::AddAdmin(target) => {
                if !self.authorize_main(from).await? {
                    return Ok(());
                }
                self.store.grant_admin(target)?;
                self.ack(from, &format!("User {target} added as admin.")).await?;
                self.notify_best_effort(target, "You have been granted admin access.").await;
                Ok(())
            }
            Command::RemoveAdmin(target) => {
                if !self.authorize_main(from).await? {
                    return Ok(());
                }
                self.store.revoke_admin(target)?;
                self.ack(from, &format!("Admin {target} removed.")).await?;
                self.notify_best_effort(target, "Your admin access has been revoked.").await;
                Ok(())
            }
            Command::Broadcast => {
                if !self.authorize(from).await? {
                    return Ok(());
                }
                self.conversations.start(from, Flow::Broadcast);
                self.ack(
                    from,
                    "Send the message (text or media) to broadcast, \
                     or /cancelbroadcast to cancel.",
                )
                .await
            }
            Command::ConfirmBroadcast => self.confirm_broadcast(from).await,
            Command::CancelBroadcast => {
                self.conversations.cancel(from, Flow::Broadcast);
                self.ack(from, "Broadcast cancelled.").await
            }
            Command::Schedule => {
                if !self.authorize(from).await? {
                    return Ok(());
                }
                self.conversations.start(from, Flow::Schedule);
                self.ack(
                    from,
                    "Send the text or media to deliver with the daily send, \
                     or /cancelschedule to cancel.",
                )
                .await
            }
            Command::CancelSchedule => {
                self.conversations.cancel(from, Flow::Schedule);
                self.ack(from, "Scheduling cancelled.").await
            }
        }
    }

    /// A non-command message: content for whichever flow is collecting.
    /// Messages outside any conversation are ignored silently.
    async fn handle_free_message(&self, from: RecipientId, content: Option<Content>) -> Result<()> {
        let Some(content) = content else {
            return Ok(());
        };
        match self.conversations.accept(from, content) {
            Accepted::Broadcast => {
                self.ack(from, "Got it. /confirmbroadcast to send, /cancelbroadcast to cancel.")
                    .await
            }
            Accepted::Schedule(content) => {
                let entry = self.store.enqueue(&content)?;
                self.ack(from, &format!("Scheduled message [{}] added.", entry.id)).await
            }
            Accepted::None => Ok(()),
        }
    }

    async fn confirm_broadcast(&self, from: RecipientId) -> Result<()> {
        // State clears here, before the fan-out: a cancel arriving later
        // must not interrupt a dispatch that was already confirmed.
        let Some(content) = self.conversations.take_collected(from) else {
            return Ok(());
        };
        self.ack(from, "Starting broadcast...").await?;

        let recipients = self.store.recipients()?;
        let outcome = self
            .dispatcher
            .dispatch(&recipients, &content, self.transport.as_ref())
            .await?;
        tracing::info!(
            "📣 Broadcast by {from}: {} ok, {} failed",
            outcome.successes,
            outcome.failures
        );
        self.ack(
            from,
            &format!(
                "Broadcast done! Successes: {}, Failures: {}",
                outcome.successes, outcome.failures
            ),
        )
        .await
    }

    /// Admin gate. On failure sends the denial and mutates nothing.
    async fn authorize(&self, from: RecipientId) -> Result<bool> {
        if self.store.is_admin(from)? {
            return Ok(true);
        }
        self.ack(from, "Access denied. You are not an admin.").await?;
        Ok(false)
    }

    /// Main-admin gate for admin-store mutation.
    async fn authorize_main(&self, from: RecipientId) -> Result<bool> {
        if from == self.main_admin {
            return Ok(true);
        }
        self.ack(from, "Only the main admin can manage admins.").await?;
        Ok(false)
    }

    async fn ack(&self, to: RecipientId, text: &str) -> Result<()> {
        self.transport.deliver(to, &Content::text(text)?).await
    }

    /// Courtesy notification; failure is logged, never propagated.
    async fn notify_best_effort(&self, to: RecipientId, text: &str) {
        if let Err(e) = self.ack(to, text).await {
            tracing::warn!("Could not notify {to}: {e}");
        }
    }
}
