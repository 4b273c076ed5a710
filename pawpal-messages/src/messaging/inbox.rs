//! Conversation list (inbox) screen.

use crate::constants::polling::POLL_INTERVAL_SECS;
use crate::constants::storage::LAST_CONVERSATION_MAX_AGE_DAYS;
use crate::error::ErrorDescriptor;
use crate::messaging::last_conversation::{self, LastConversation};
use crate::messaging::state::{ViewState, ViewStateCell};
use crate::scheduler::{poll_task, PollOutcome, PollScheduler, PollTask};
use crate::session::SessionProvider;
use crate::storage::KeyValueStore;
use pawpal_api::{normalize, Conversation, MessageService};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;

/// View-model of the inbox.
///
/// Polls the conversation list while active. A failed refresh keeps the
/// last good list, exposes an error, and halts polling until [`retry`]
/// is called.
///
/// [`retry`]: InboxViewModel::retry
pub struct InboxViewModel {
    inner: Arc<InboxInner>,
    scheduler: PollScheduler,
}

struct InboxInner {
    service: Arc<dyn MessageService>,
    session: Arc<dyn SessionProvider>,
    store: Arc<dyn KeyValueStore>,
    state: ViewStateCell<Conversation>,
    record_max_age: Duration,
}

impl InboxViewModel {
    pub fn new(
        service: Arc<dyn MessageService>,
        session: Arc<dyn SessionProvider>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            inner: Arc::new(InboxInner {
                service,
                session,
                store,
                state: ViewStateCell::new(),
                record_max_age: Duration::from_secs(LAST_CONVERSATION_MAX_AGE_DAYS * 24 * 60 * 60),
            }),
            scheduler: PollScheduler::new(Duration::from_secs(POLL_INTERVAL_SECS)),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.scheduler = PollScheduler::new(interval);
        self
    }

    /// Age beyond which the fallback record is ignored. Must be called
    /// before the view-model is shared.
    pub fn with_record_max_age(mut self, max_age: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.record_max_age = max_age;
        }
        self
    }

    pub fn state(&self) -> ViewState<Conversation> {
        self.inner.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<Conversation>> {
        self.inner.state.subscribe()
    }

    /// Start loading and polling. Completes after the first load; calling
    /// it again while active does nothing.
    pub async fn activate(&self) {
        if self.inner.is_torn_down() {
            tracing::warn!("Ignoring activation of a torn down inbox");
            return;
        }
        if self.scheduler.is_active() {
            tracing::debug!("Inbox already active");
            return;
        }
        self.inner.state.begin_first_load();
        self.scheduler.start(self.task()).await;
    }

    /// Stop polling. Results of requests still in flight are discarded.
    pub fn deactivate(&self) {
        if self.inner.state.close() {
            tracing::debug!("Inbox deactivated");
        }
        self.scheduler.stop();
    }

    /// Clear the error and load again, resuming polling if it succeeds.
    pub async fn retry(&self) {
        if self.inner.is_torn_down() {
            return;
        }
        tracing::info!("Retrying conversation list");
        self.inner.state.clear_error();
        if !self.scheduler.start(self.task()).await {
            self.scheduler.refresh(&self.task()).await;
        }
    }

    /// Conversations whose counterpart or pet name contains `query`,
    /// ignoring case. Filters the loaded list; nothing is fetched.
    pub fn search(&self, query: &str) -> Vec<Conversation> {
        filter_conversations(&self.inner.state.snapshot().items, query)
    }

    /// The last opened conversation, offered when the list is empty or
    /// failed to load.
    pub fn fallback_conversation(&self) -> Option<LastConversation> {
        let state = self.inner.state.snapshot();
        if !state.items.is_empty() && state.error.is_none() {
            return None;
        }
        last_conversation::recall(self.inner.store.as_ref(), self.inner.record_max_age)
    }

    fn task(&self) -> PollTask {
        let inner: Weak<InboxInner> = Arc::downgrade(&self.inner);
        poll_task(move || {
            let inner = inner.upgrade();
            async move {
                match inner {
                    Some(inner) => inner.load().await,
                    None => PollOutcome::Halt,
                }
            }
        })
    }
}

impl InboxInner {
    fn is_torn_down(&self) -> bool {
        self.state.is_closed()
    }

    async fn load(&self) -> PollOutcome {
        if self.is_torn_down() {
            return PollOutcome::Halt;
        }
        if self.session.current_user().is_none() {
            tracing::debug!("No signed-in user, skipping conversation fetch");
            self.state.apply_signed_out();
            return PollOutcome::Continue;
        }

        let result = self.service.list_conversations().await;

        if self.is_torn_down() {
            tracing::debug!("Inbox torn down, discarding conversation list");
            return PollOutcome::Halt;
        }

        match result {
            Ok(raw) => {
                let conversations = prepare_conversations(&raw);
                let count = conversations.len();
                if self.state.apply_items(conversations) {
                    tracing::debug!("Conversation list updated: {} conversations", count);
                }
                PollOutcome::Continue
            }
            Err(err) if err.is_not_found() => {
                tracing::debug!("No conversations yet");
                self.state.apply_items(Vec::new());
                PollOutcome::Continue
            }
            Err(err) => {
                tracing::warn!("Failed to load conversations: {}", err);
                self.state.apply_error(ErrorDescriptor::from_api(&err));
                PollOutcome::Halt
            }
        }
    }
}

/// Normalize raw payloads, dropping conversations without a resolvable
/// counterpart or pet and repeated `(counterpart, pet)` pairs.
pub fn prepare_conversations(raw: &[Value]) -> Vec<Conversation> {
    let mut seen: HashSet<(String, i64)> = HashSet::new();
    let mut conversations = Vec::with_capacity(raw.len());

    for payload in raw {
        let conversation = normalize(payload);
        let Some((other, pet)) = conversation.identity() else {
            tracing::warn!(
                "Dropping conversation without user or pet id (user: {:?}, pet: {:?})",
                conversation.other_party.id,
                conversation.subject_pet.as_ref().map(|p| p.id)
            );
            continue;
        };
        if !seen.insert((other.to_string(), pet)) {
            tracing::debug!("Dropping duplicate conversation ({}, {})", other, pet);
            continue;
        }
        conversations.push(conversation);
    }

    conversations
}

/// Case-insensitive substring match over counterpart username and pet name.
pub fn filter_conversations(conversations: &[Conversation], query: &str) -> Vec<Conversation> {
    let query = query.trim().to_lowercase();
    conversations
        .iter()
        .filter(|c| {
            query.is_empty()
                || c.other_party.username.to_lowercase().contains(&query)
                || c.pet_name().to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalid_conversations_are_dropped_in_order() {
        let raw = vec![
            json!({"other_user": {"id": 1, "username": "ana"}, "pet": {"id": 10, "name": "Rex"}}),
            json!({"other_user": {"id": 2, "username": "ben"}, "pet": "not-a-number"}),
            json!({"pet": 11}),
            json!({"user": 3, "pet_detail": {"id": 12, "name": "Tom"}}),
        ];
        let conversations = prepare_conversations(&raw);
        let identities: Vec<_> = conversations.iter().map(|c| c.identity().unwrap()).collect();
        assert_eq!(identities, vec![("1", 10), ("3", 12)]);
    }

    #[test]
    fn test_duplicates_keep_first() {
        let raw = vec![
            json!({"other_user": 1, "pet": 10, "unread_count": 2}),
            json!({"other_user": "1", "pet": {"id": 10}, "unread_count": 5}),
        ];
        let conversations = prepare_conversations(&raw);
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].unread_count, 2);
    }

    #[test]
    fn test_search_matches_username_or_pet() {
        let conversations = prepare_conversations(&[
            json!({"other_user": {"id": 1, "username": "Maria"}, "pet": {"id": 10, "name": "Biscuit"}}),
            json!({"other_user": {"id": 2, "username": "sam"}, "pet": {"id": 11, "name": "Marigold"}}),
            json!({"other_user": {"id": 3, "username": "lee"}, "pet": {"id": 12, "name": "Rex"}}),
        ]);

        let names = |found: Vec<Conversation>| -> Vec<String> {
            found.into_iter().map(|c| c.other_party.username).collect()
        };
        assert_eq!(names(filter_conversations(&conversations, "MARI")), vec!["Maria", "sam"]);
        assert_eq!(names(filter_conversations(&conversations, "rex")), vec!["lee"]);
        assert_eq!(filter_conversations(&conversations, "  ").len(), 3);
        assert!(filter_conversations(&conversations, "zzz").is_empty());
    }
}
