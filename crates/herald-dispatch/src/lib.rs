//! # Herald Dispatch
//!
//! Rate-limited batched fan-out: one piece of content to N recipients with
//! bounded concurrency and inter-batch pacing. Stateless between calls — the
//! only shared thing is the transport capability it is handed.
//!
//! Pacing contract: batches of `batch_size` delivered concurrently, a fixed
//! `batch_delay` between batches and none after the last, giving a
//! steady-state ceiling of `batch_size / batch_delay` deliveries per unit
//! time (5/sec, i.e. ≤300/min, with defaults).

use std::time::Duration;

use async_trait::async_trait;
use futures::future;

use herald_core::config::BroadcastConfig;
use herald_core::{Content, RecipientId, Result};

/// One delivery attempt to one recipient. Stands in for the Bot API client;
/// per-delivery timeouts live behind this seam, not in the dispatcher.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, recipient: RecipientId, content: &Content) -> Result<()>;
}

/// Aggregate result of a dispatch call.
/// `successes + failures` always equals the recipient count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    pub successes: usize,
    pub failures: usize,
}

impl DispatchOutcome {
    pub fn total(&self) -> usize {
        self.successes + self.failures
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    batch_size: usize,
    batch_delay: Duration,
}

impl Dispatcher {
    pub fn new(batch_size: usize, batch_delay_ms: u64) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_delay: Duration::from_millis(batch_delay_ms),
        }
    }

    pub fn from_config(config: &BroadcastConfig) -> Self {
        Self::new(config.batch_size, config.batch_delay_ms)
    }

    /// Number of batches a recipient set of this size produces.
    pub fn batch_count(&self, recipients: usize) -> usize {
        recipients.div_ceil(self.batch_size)
    }

    /// Fan `content` out to every recipient, batched and paced.
    ///
    /// A failed delivery is counted and swallowed — it never aborts the
    /// batch, is never retried, and never fails the call. The only error
    /// path is malformed content, rejected before the first batch starts.
    /// An empty recipient set returns `{0, 0}` immediately.
    pub async fn dispatch(
        &self,
        recipients: &[RecipientId],
        content: &Content,
        transport: &dyn Transport,
    ) -> Result<DispatchOutcome> {
        content.validate()?;

        let total = recipients.len();
        let mut outcome = DispatchOutcome::default();
        if total == 0 {
            return Ok(outcome);
        }

        let batches = self.batch_count(total);
        for (index, batch) in recipients.chunks(self.batch_size).enumerate() {
            let deliveries = batch.iter().map(|r| transport.deliver(*r, content));
            for result in future::join_all(deliveries).await {
                match result {
                    Ok(()) => outcome.successes += 1,
                    Err(e) => {
                        tracing::debug!("Delivery failed: {e}");
                        outcome.failures += 1;
                    }
                }
            }

            let processed = outcome.total();
            tracing::info!(
                "📤 Batch {}/{}: {}/{} recipients processed",
                index + 1,
                batches,
                processed,
                total
            );

            if index + 1 < batches {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use herald_core::HeraldError;

    /// Transport that records delivery order and fails for a chosen set.
    #[derive(Default)]
    struct MockTransport {
        delivered: Mutex<Vec<i64>>,
        fail_for: HashSet<i64>,
        calls: AtomicUsize,
    }

    impl MockTransport {
        fn failing_for(ids: impl IntoIterator<Item = i64>) -> Self {
            Self {
                fail_for: ids.into_iter().collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn deliver(&self, recipient: RecipientId, _content: &Content) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.delivered.lock().unwrap().push(recipient.0);
            if self.fail_for.contains(&recipient.0) {
                return Err(HeraldError::Channel("blocked".into()));
            }
            Ok(())
        }
    }

    fn recipients(n: i64) -> Vec<RecipientId> {
        (1..=n).map(RecipientId).collect()
    }

    #[tokio::test]
    async fn test_outcome_totals_match_recipient_count() {
        let transport = MockTransport::failing_for([2, 5, 9]);
        let dispatcher = Dispatcher::new(5, 0);
        let outcome = dispatcher
            .dispatch(&recipients(12), &Content::text("hi").unwrap(), &transport)
            .await
            .unwrap();
        assert_eq!(outcome.successes, 9);
        assert_eq!(outcome.failures, 3);
        assert_eq!(outcome.total(), 12);
    }

    #[tokio::test]
    async fn test_empty_recipients_zero_batches() {
        let transport = MockTransport::default();
        let dispatcher = Dispatcher::new(5, 1000);
        let outcome = dispatcher
            .dispatch(&[], &Content::text("hi").unwrap(), &transport)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::default());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batches_follow_input_order() {
        let transport = MockTransport::default();
        let dispatcher = Dispatcher::new(3, 0);
        let input = recipients(7);
        dispatcher
            .dispatch(&input, &Content::text("hi").unwrap(), &transport)
            .await
            .unwrap();

        // Batch boundaries must follow input order: {1,2,3}, {4,5,6}, {7}.
        let delivered = transport.delivered.lock().unwrap().clone();
        assert_eq!(delivered.len(), 7);
        let batches: Vec<HashSet<i64>> =
            delivered.chunks(3).map(|c| c.iter().copied().collect()).collect();
        assert_eq!(batches[0], HashSet::from([1, 2, 3]));
        assert_eq!(batches[1], HashSet::from([4, 5, 6]));
        assert_eq!(batches[2], HashSet::from([7]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inter_batch_delay_skips_final_batch() {
        // 12 recipients, B=5 → 3 batches → exactly 2 delays of 1s each.
        let transport = MockTransport::default();
        let dispatcher = Dispatcher::new(5, 1000);
        let started = tokio::time::Instant::now();
        dispatcher
            .dispatch(&recipients(12), &Content::text("hi").unwrap(), &transport)
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_batch_no_delay() {
        let transport = MockTransport::default();
        let dispatcher = Dispatcher::new(5, 1000);
        let started = tokio::time::Instant::now();
        dispatcher
            .dispatch(&recipients(5), &Content::text("hi").unwrap(), &transport)
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_malformed_content_rejected_before_any_delivery() {
        // serde can build values the constructors refuse.
        let bad: Content = serde_json::from_str(r#"{"kind":"photo","media_ref":""}"#).unwrap();
        let transport = MockTransport::default();
        let dispatcher = Dispatcher::new(5, 0);
        let err = dispatcher.dispatch(&recipients(4), &bad, &transport).await;
        assert!(matches!(err, Err(HeraldError::Content(_))));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_batch_count_math() {
        let d = Dispatcher::new(5, 0);
        assert_eq!(d.batch_count(0), 0);
        assert_eq!(d.batch_count(1), 1);
        assert_eq!(d.batch_count(5), 1);
        assert_eq!(d.batch_count(6), 2);
        assert_eq!(d.batch_count(12), 3);
    }
}
