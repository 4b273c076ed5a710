//! Chat thread screen for one `(counterpart, pet)` conversation.

use crate::constants::polling::POLL_INTERVAL_SECS;
use crate::error::{ErrorDescriptor, SendError, ValidationError};
use crate::fl;
use crate::messaging::grouping::{group_messages, DateGroup};
use crate::messaging::last_conversation::{self, LastConversation};
use crate::messaging::state::{ViewState, ViewStateCell};
use crate::scheduler::{poll_task, PollOutcome, PollScheduler, PollTask};
use crate::session::{CurrentUser, SessionProvider};
use crate::storage::KeyValueStore;
use pawpal_api::{Message, MessageService, PetRef, SendMessageRequest, UserRef};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;

/// Identity of a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadKey {
    pub other_party_id: String,
    pub subject_pet_id: i64,
}

/// How a thread screen was opened. Both ids are required for the screen
/// to work; the names are display hints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadRoute {
    pub other_party_id: Option<String>,
    pub subject_pet_id: Option<i64>,
    pub other_username: Option<String>,
    pub pet_name: Option<String>,
}

impl ThreadRoute {
    pub fn new(other_party_id: impl Into<String>, subject_pet_id: i64) -> Self {
        Self {
            other_party_id: Some(other_party_id.into()),
            subject_pet_id: Some(subject_pet_id),
            ..Self::default()
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.other_username = Some(username.into());
        self
    }

    pub fn with_pet_name(mut self, name: impl Into<String>) -> Self {
        self.pet_name = Some(name.into());
        self
    }

    pub fn key(&self) -> Option<ThreadKey> {
        let other_party_id = self
            .other_party_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())?;
        Some(ThreadKey {
            other_party_id: other_party_id.to_string(),
            subject_pet_id: self.subject_pet_id?,
        })
    }
}

/// Whether `message` was sent by `user`, for left/right alignment.
///
/// Compares usernames, not ids.
pub fn is_own_message(message: &Message, user: &CurrentUser) -> bool {
    message.sender.username == user.username
}

/// Whether any message from someone other than `user` is still unread.
pub fn has_unread_for(messages: &[Message], user: &CurrentUser) -> bool {
    messages
        .iter()
        .any(|message| !message.is_read && message.sender.id != user.id)
}

/// View-model of a chat thread.
///
/// Polls the thread while active and marks it read when messages addressed
/// to the current user are unread. Sending never inserts locally: the sent
/// message shows up through the refresh that follows.
pub struct ThreadViewModel {
    inner: Arc<ThreadInner>,
    scheduler: PollScheduler,
}

struct ThreadInner {
    service: Arc<dyn MessageService>,
    session: Arc<dyn SessionProvider>,
    store: Arc<dyn KeyValueStore>,
    key: Option<ThreadKey>,
    other_username: Mutex<Option<String>>,
    pet_name: String,
    state: ViewStateCell<Message>,
    remembered: AtomicBool,
}

impl ThreadViewModel {
    pub fn new(
        service: Arc<dyn MessageService>,
        session: Arc<dyn SessionProvider>,
        store: Arc<dyn KeyValueStore>,
        route: ThreadRoute,
    ) -> Self {
        let key = route.key();
        if key.is_none() {
            tracing::warn!(
                "Thread opened without a user or pet id (user: {:?}, pet: {:?})",
                route.other_party_id,
                route.subject_pet_id
            );
        }

        Self {
            inner: Arc::new(ThreadInner {
                service,
                session,
                store,
                key,
                other_username: Mutex::new(route.other_username.filter(|name| !name.is_empty())),
                pet_name: route.pet_name.unwrap_or_default(),
                state: ViewStateCell::new(),
                remembered: AtomicBool::new(false),
            }),
            scheduler: PollScheduler::new(Duration::from_secs(POLL_INTERVAL_SECS)),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.scheduler = PollScheduler::new(interval);
        self
    }

    pub fn key(&self) -> Option<&ThreadKey> {
        self.inner.key.as_ref()
    }

    /// False when the screen was opened without both ids; such a screen
    /// renders an invalid state and never fetches.
    pub fn is_valid(&self) -> bool {
        self.inner.key.is_some()
    }

    /// Counterpart username, once known from the route or from a message.
    pub fn other_username(&self) -> Option<String> {
        self.inner.other_username()
    }

    pub fn state(&self) -> ViewState<Message> {
        self.inner.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<Message>> {
        self.inner.state.subscribe()
    }

    /// Start loading and polling. Completes after the first load; calling
    /// it again while active does nothing.
    pub async fn activate(&self) {
        if !self.is_valid() {
            return;
        }
        if self.inner.is_torn_down() {
            tracing::warn!("Ignoring activation of a torn down thread");
            return;
        }
        if self.scheduler.is_active() {
            tracing::debug!("Thread already active");
            return;
        }
        self.inner.state.begin_first_load();
        self.scheduler.start(self.task()).await;
    }

    /// Stop polling. Results of requests still in flight are discarded.
    pub fn deactivate(&self) {
        if self.inner.state.close() {
            tracing::debug!("Thread deactivated");
        }
        self.scheduler.stop();
    }

    /// Load the thread now, after any refresh already in flight.
    pub async fn refresh(&self) {
        if !self.is_valid() || self.inner.is_torn_down() {
            return;
        }
        self.scheduler.refresh(&self.task()).await;
    }

    /// Send `content` to the counterpart, then reload the thread.
    ///
    /// Blank content is rejected without any request. On failure a notice
    /// is set and the message list is left untouched.
    pub async fn send(&self, content: &str) -> Result<Message, SendError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }
        let key = self
            .inner
            .key
            .clone()
            .ok_or(ValidationError::MissingIdentifiers)?;
        if self.inner.session.current_user().is_none() {
            return Err(ValidationError::SignedOut.into());
        }
        let receiver_username = self
            .inner
            .other_username()
            .ok_or(ValidationError::UnknownRecipient)?;

        let request = SendMessageRequest {
            receiver_username,
            subject_pet_id: key.subject_pet_id,
            content: content.to_string(),
        };

        match self.inner.service.send_message(&request).await {
            Ok(message) => {
                self.inner.remember(&key);
                if self.inner.is_torn_down() {
                    return Ok(message);
                }
                self.inner.state.set_notice(None);
                self.refresh().await;
                Ok(message)
            }
            Err(err) => {
                tracing::warn!("Failed to send message: {}", err);
                self.inner.state.set_notice(Some(fl!("send-failed")));
                Err(err.into())
            }
        }
    }

    pub fn dismiss_notice(&self) {
        self.inner.state.set_notice(None);
    }

    /// Loaded messages bucketed by day and sender run.
    pub fn grouped(&self) -> Vec<DateGroup> {
        group_messages(&self.inner.state.snapshot().items)
    }

    /// Whether `message` was sent by the signed-in user.
    pub fn is_own_message(&self, message: &Message) -> bool {
        self.inner
            .session
            .current_user()
            .is_some_and(|user| is_own_message(message, &user))
    }

    fn task(&self) -> PollTask {
        let inner: Weak<ThreadInner> = Arc::downgrade(&self.inner);
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

impl ThreadInner {
    fn is_torn_down(&self) -> bool {
        self.state.is_closed()
    }

    fn other_username(&self) -> Option<String> {
        self.other_username
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Pick up the counterpart's username from their own messages when the
    /// route did not carry it.
    fn learn_username(&self, key: &ThreadKey, messages: &[Message]) {
        let mut username = self
            .other_username
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if username.is_some() {
            return;
        }
        if let Some(found) = messages
            .iter()
            .find(|m| m.sender.id == key.other_party_id && !m.sender.username.is_empty())
        {
            *username = Some(found.sender.username.clone());
        }
    }

    /// Persist this thread as the last conversation. Skipped while the
    /// counterpart username is unknown, since the record could not be
    /// shown.
    fn remember(&self, key: &ThreadKey) {
        let Some(username) = self.other_username() else {
            tracing::debug!(
                "Not remembering thread ({}, {}) before its username is known",
                key.other_party_id,
                key.subject_pet_id
            );
            return;
        };
        let record = LastConversation::new(
            UserRef {
                id: key.other_party_id.clone(),
                username,
            },
            PetRef {
                id: key.subject_pet_id,
                name: self.pet_name.clone(),
            },
        );
        last_conversation::remember(self.store.as_ref(), &record);
        self.remembered.store(true, Ordering::SeqCst);
    }

    async fn load(&self) -> PollOutcome {
        let Some(key) = self.key.as_ref() else {
            return PollOutcome::Halt;
        };
        if self.is_torn_down() {
            return PollOutcome::Halt;
        }
        let Some(user) = self.session.current_user() else {
            tracing::debug!("No signed-in user, skipping thread fetch");
            self.state.apply_signed_out();
            return PollOutcome::Continue;
        };

        let result = self
            .service
            .get_thread(&key.other_party_id, key.subject_pet_id)
            .await;

        if self.is_torn_down() {
            tracing::debug!("Thread torn down, discarding messages");
            return PollOutcome::Halt;
        }

        match result {
            Ok(messages) => {
                self.learn_username(key, &messages);
                let unread = has_unread_for(&messages, &user);
                let count = messages.len();
                if self.state.apply_items(messages) {
                    tracing::debug!(
                        "Thread ({}, {}) updated: {} messages",
                        key.other_party_id,
                        key.subject_pet_id,
                        count
                    );
                }
                if self.is_torn_down() {
                    return PollOutcome::Halt;
                }
                if !self.remembered.load(Ordering::SeqCst) {
                    self.remember(key);
                }
                if unread {
                    self.mark_read(key.clone());
                }
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to load thread ({}, {}): {}",
                    key.other_party_id,
                    key.subject_pet_id,
                    err
                );
                self.state.apply_error(ErrorDescriptor::from_api(&err));
            }
        }

        PollOutcome::Continue
    }

    /// Fire-and-forget: failures are logged and never reach the screen.
    fn mark_read(&self, key: ThreadKey) {
        let service = Arc::clone(&self.service);
        tokio::spawn(async move {
            match service
                .mark_thread_read(&key.other_party_id, key.subject_pet_id)
                .await
            {
                Ok(()) => tracing::debug!(
                    "Marked thread ({}, {}) as read",
                    key.other_party_id,
                    key.subject_pet_id
                ),
                Err(err) => tracing::warn!(
                    "Failed to mark thread ({}, {}) as read: {}",
                    key.other_party_id,
                    key.subject_pet_id,
                    err
                ),
            }
        });
    }
}
