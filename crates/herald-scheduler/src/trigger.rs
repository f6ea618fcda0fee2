//! Daily trigger — drains the scheduled queue through the dispatcher.

use std::sync::Arc;

use chrono::Utc;

use herald_core::Result;
use herald_dispatch::{DispatchOutcome, Dispatcher, Transport};
use herald_store::Store;

/// Drains the scheduled-content queue against the full recipient set on a
/// cron schedule. Holds no state of its own — the queue is the durable part.
pub struct DailyTrigger<T: Transport> {
    store: Arc<Store>,
    dispatcher: Dispatcher,
    transport: Arc<T>,
    schedule: crate::CronSchedule,
}

impl<T: Transport> DailyTrigger<T> {
    pub fn new(
        store: Arc<Store>,
        dispatcher: Dispatcher,
        transport: Arc<T>,
        schedule: crate::CronSchedule,
    ) -> Self {
        Self { store, dispatcher, transport, schedule }
    }

    /// One trigger cycle: read the recipient set, drain the queue, dispatch
    /// each entry oldest-first and remove it afterwards regardless of how
    /// many individual deliveries failed. Queue residency is at-most-once;
    /// an entry is never retried on a later cycle.
    ///
    /// Any error (directory read, drain, a corrupt entry, removal) aborts
    /// the remaining entries without touching them, so they stay queued for
    /// the next fire. Returns the per-entry outcomes of this cycle.
    pub async fn run_cycle(&self) -> Result<Vec<(i64, DispatchOutcome)>> {
        let recipients = self.store.recipients()?;
        let entries = self.store.drain()?;
        if entries.is_empty() {
            tracing::debug!("No scheduled content, cycle done");
            return Ok(Vec::new());
        }

        tracing::info!(
            "🗞️ Draining {} scheduled entries to {} recipients",
            entries.len(),
            recipients.len()
        );

        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            let outcome = self
                .dispatcher
                .dispatch(&recipients, &entry.content, self.transport.as_ref())
                .await?;
            self.store.remove_scheduled(entry.id)?;
            tracing::info!(
                "📬 Scheduled [{}] sent: {} ok, {} failed",
                entry.id,
                outcome.successes,
                outcome.failures
            );
            outcomes.push((entry.id, outcome));
        }
        Ok(outcomes)
    }

    /// Timer loop: sleep until the next cron fire, run a cycle, repeat.
    /// A failed cycle is logged; the next fire proceeds independently.
    pub async fn run(self) {
        loop {
            let now = Utc::now();
            let Some(next) = self.schedule.next_after(now) else {
                tracing::error!("Cron schedule yields no next fire, trigger stopped");
                return;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!("⏰ Next scheduled drain at {next}");
            tokio::time::sleep(wait).await;

            match self.run_cycle().await {
                Ok(outcomes) if outcomes.is_empty() => {}
                Ok(outcomes) => tracing::info!("✅ Cycle complete: {} entries", outcomes.len()),
                Err(e) => tracing::warn!("⚠️ Scheduled cycle aborted: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use herald_core::{Content, HeraldError, RecipientId};
    use herald_store::Store;

    /// Fails each (recipient, text) pair listed, once per dispatch of that text.
    struct ScriptedTransport {
        fail_pairs: Mutex<Vec<(i64, String)>>,
        sent: Mutex<Vec<(i64, String)>>,
    }

    impl ScriptedTransport {
        fn new(fail_pairs: Vec<(i64, &str)>) -> Self {
            Self {
                fail_pairs: Mutex::new(
                    fail_pairs.into_iter().map(|(id, t)| (id, t.to_string())).collect(),
                ),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn deliver(&self, recipient: RecipientId, content: &Content) -> Result<()> {
            let text = content.text_part().unwrap_or_default().to_string();
            self.sent.lock().unwrap().push((recipient.0, text.clone()));
            let mut fails = self.fail_pairs.lock().unwrap();
            if let Some(pos) = fails.iter().position(|(id, t)| *id == recipient.0 && *t == text) {
                fails.remove(pos);
                return Err(HeraldError::Channel("blocked".into()));
            }
            Ok(())
        }
    }

    fn store_with(recipients: &[i64], queued: &[&str]) -> Arc<Store> {
        let store = Store::open_in_memory(10).unwrap();
        for id in recipients {
            store.register_recipient(RecipientId(*id)).unwrap();
        }
        for text in queued {
            store.enqueue(&Content::text(*text).unwrap()).unwrap();
        }
        Arc::new(store)
    }

    fn trigger<T: Transport>(store: Arc<Store>, transport: Arc<T>) -> DailyTrigger<T> {
        DailyTrigger::new(
            store,
            Dispatcher::new(5, 0),
            transport,
            crate::CronSchedule::parse("0 0 * * *").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_cycle_sends_oldest_first_and_empties_queue() {
        // Scenario C: 2 entries, 3 recipients, one delivery fails on the
        // first entry only → outcomes {2,1} then {3,0}, queue empty after.
        let store = store_with(&[1, 2, 3], &["first", "second"]);
        let transport = Arc::new(ScriptedTransport::new(vec![(2, "first")]));
        let trigger = trigger(store.clone(), transport.clone());

        let outcomes = trigger.run_cycle().await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].1, DispatchOutcome { successes: 2, failures: 1 });
        assert_eq!(outcomes[1].1, DispatchOutcome { successes: 3, failures: 0 });
        assert!(store.drain().unwrap().is_empty());

        // entry order: all "first" sends precede all "second" sends
        let sent = transport.sent.lock().unwrap();
        let boundary = sent.iter().position(|(_, t)| t == "second").unwrap();
        assert!(sent[..boundary].iter().all(|(_, t)| t == "first"));
        assert_eq!(sent.len(), 6);
    }

    #[tokio::test]
    async fn test_empty_queue_is_a_noop_cycle() {
        let store = store_with(&[1, 2], &[]);
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let trigger = trigger(store.clone(), transport.clone());

        assert!(trigger.run_cycle().await.unwrap().is_empty());
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entry_removed_even_when_every_delivery_fails() {
        let store = store_with(&[1], &["doomed"]);
        let transport = Arc::new(ScriptedTransport::new(vec![(1, "doomed")]));
        let trigger = trigger(store.clone(), transport);

        let outcomes = trigger.run_cycle().await.unwrap();
        assert_eq!(outcomes[0].1, DispatchOutcome { successes: 0, failures: 1 });
        assert!(store.drain().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_recipients_still_drains() {
        let store = store_with(&[], &["nobody-home"]);
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let trigger = trigger(store.clone(), transport);

        let outcomes = trigger.run_cycle().await.unwrap();
        assert_eq!(outcomes[0].1, DispatchOutcome::default());
        assert!(store.drain().unwrap().is_empty());
    }
}
