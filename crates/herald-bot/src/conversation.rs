//! Per-operator conversation state machine.
//!
//! `idle → collecting → collected → (confirmed|cancelled) → idle`.
//!
//! One operator holds at most one active flow at a time: starting a flow
//! supersedes whatever was active before (last-initiation-wins), so a free
//! message is never ambiguous about which flow it belongs to. State is
//! process-scoped by design; nothing here is persisted.

use std::collections::HashMap;
use std::sync::Mutex;

use herald_core::{Content, RecipientId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Broadcast,
    Schedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Collecting,
    Collected,
}

#[derive(Debug, Clone)]
struct Conversation {
    flow: Flow,
    step: Step,
    content: Option<Content>,
}

/// What `accept` did with a free message.
#[derive(Debug, Clone, PartialEq)]
pub enum Accepted {
    /// Held for `/confirmbroadcast`; state advanced to `Collected`.
    Broadcast,
    /// Schedule flow collects exactly one message and closes; the caller
    /// enqueues this content immediately.
    Schedule(Content),
    /// No flow was collecting — the message is not part of any conversation.
    None,
}

/// Keyed store of in-flight conversations. The single mutex serializes
/// read-modify-write per key, so two quick messages from one operator can
/// never interleave their state updates.
#[derive(Default)]
pub struct ConversationStore {
    inner: Mutex<HashMap<RecipientId, Conversation>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a flow for this operator, superseding any prior state for
    /// either flow with no warning.
    pub fn start(&self, operator: RecipientId, flow: Flow) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.insert(operator, Conversation { flow, step: Step::Collecting, content: None });
    }

    /// Route a free message into the operator's active flow. Silently does
    /// nothing when no flow is collecting.
    pub fn accept(&self, operator: RecipientId, content: Content) -> Accepted {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let Some(state) = inner.get_mut(&operator) else {
            return Accepted::None;
        };
        if state.step != Step::Collecting {
            return Accepted::None;
        }
        match state.flow {
            Flow::Broadcast => {
                state.step = Step::Collected;
                state.content = Some(content);
                Accepted::Broadcast
            }
            Flow::Schedule => {
                inner.remove(&operator);
                Accepted::Schedule(content)
            }
        }
    }

    /// Confirm the broadcast flow: returns the held content and clears the
    /// state. `None` when the operator has nothing collected — the caller
    /// treats that as a message outside any conversation.
    pub fn take_collected(&self, operator: RecipientId) -> Option<Content> {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let ready = inner
            .get(&operator)
            .is_some_and(|s| s.flow == Flow::Broadcast && s.step == Step::Collected);
        if ready {
            inner.remove(&operator).and_then(|s| s.content)
        } else {
            None
        }
    }

    /// Clear the operator's state if the given flow is the active one.
    /// Idempotent: cancelling with no state is a no-op, never an error.
    pub fn cancel(&self, operator: RecipientId, flow: Flow) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if inner.get(&operator).is_some_and(|s| s.flow == flow) {
            inner.remove(&operator);
        }
    }

    /// The operator's active flow and step, if any.
    pub fn active(&self, operator: RecipientId) -> Option<(Flow, Step)> {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.get(&operator).map(|s| (s.flow, s.step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Content {
        Content::text(s).unwrap()
    }

    const OP: RecipientId = RecipientId(1);

    #[test]
    fn test_broadcast_collect_then_confirm() {
        let store = ConversationStore::new();
        store.start(OP, Flow::Broadcast);
        assert_eq!(store.active(OP), Some((Flow::Broadcast, Step::Collecting)));

        assert_eq!(store.accept(OP, text("hello")), Accepted::Broadcast);
        assert_eq!(store.active(OP), Some((Flow::Broadcast, Step::Collected)));

        assert_eq!(store.take_collected(OP), Some(text("hello")));
        assert_eq!(store.active(OP), None);
    }

    #[test]
    fn test_schedule_collects_one_message_and_closes() {
        let store = ConversationStore::new();
        store.start(OP, Flow::Schedule);
        assert_eq!(store.accept(OP, text("daily")), Accepted::Schedule(text("daily")));
        assert_eq!(store.active(OP), None);
        // a second message is outside any conversation
        assert_eq!(store.accept(OP, text("again")), Accepted::None);
    }

    #[test]
    fn test_accept_without_flow_is_silent_noop() {
        let store = ConversationStore::new();
        assert_eq!(store.accept(OP, text("stray")), Accepted::None);
    }

    #[test]
    fn test_accept_after_collected_is_noop() {
        let store = ConversationStore::new();
        store.start(OP, Flow::Broadcast);
        store.accept(OP, text("one"));
        assert_eq!(store.accept(OP, text("two")), Accepted::None);
        assert_eq!(store.take_collected(OP), Some(text("one")));
    }

    #[test]
    fn test_confirm_requires_collected_broadcast() {
        let store = ConversationStore::new();
        assert_eq!(store.take_collected(OP), None);

        store.start(OP, Flow::Broadcast);
        assert_eq!(store.take_collected(OP), None); // still collecting
        assert_eq!(store.active(OP), Some((Flow::Broadcast, Step::Collecting)));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let store = ConversationStore::new();
        store.cancel(OP, Flow::Broadcast); // no state at all
        store.start(OP, Flow::Broadcast);
        store.cancel(OP, Flow::Broadcast);
        store.cancel(OP, Flow::Broadcast); // twice in a row
        assert_eq!(store.active(OP), None);
    }

    #[test]
    fn test_cancel_only_clears_matching_flow() {
        let store = ConversationStore::new();
        store.start(OP, Flow::Schedule);
        store.cancel(OP, Flow::Broadcast);
        assert_eq!(store.active(OP), Some((Flow::Schedule, Step::Collecting)));
    }

    #[test]
    fn test_last_initiation_wins() {
        let store = ConversationStore::new();
        store.start(OP, Flow::Broadcast);
        store.accept(OP, text("held"));
        store.start(OP, Flow::Schedule);
        // the held broadcast content is gone; the schedule flow is active
        assert_eq!(store.take_collected(OP), None);
        assert_eq!(store.active(OP), Some((Flow::Schedule, Step::Collecting)));
    }

    #[test]
    fn test_operators_are_independent() {
        let store = ConversationStore::new();
        let other = RecipientId(2);
        store.start(OP, Flow::Broadcast);
        store.start(other, Flow::Schedule);
        store.cancel(other, Flow::Schedule);
        assert_eq!(store.active(OP), Some((Flow::Broadcast, Step::Collecting)));
        assert_eq!(store.active(other), None);
    }
}
