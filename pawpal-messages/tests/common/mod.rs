#![allow(dead_code)]

use async_trait::async_trait;
use pawpal_api::{ApiError, Message, MessageService, SendMessageRequest, UserRef};
use pawpal_messages::{KeyValueStore, MemoryStore, SessionProvider, StaticSession};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

pub const ME_ID: &str = "1";
pub const ME_NAME: &str = "ana";
pub const OTHER_ID: &str = "2";
pub const OTHER_NAME: &str = "ben";
pub const PET_ID: i64 = 10;

pub const INTERVAL: Duration = Duration::from_secs(10);

/// Slightly more than one poll interval.
pub const ONE_TICK: Duration = Duration::from_millis(10_500);

/// How a scripted call answers. `Fail(None)` is a network failure.
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Fail(Option<u16>),
}

fn failure(status: Option<u16>) -> ApiError {
    match status {
        Some(status) => ApiError::Status {
            status,
            message: format!("scripted {}", status),
        },
        None => ApiError::Network("connection refused".into()),
    }
}

/// A [`MessageService`] answering from in-memory scripts.
///
/// Replies repeat until replaced. The thread behaves like a small server:
/// sent messages are appended and marking read flips the counterpart's
/// messages to read.
pub struct MockService {
    conversations: Mutex<Reply<Vec<Value>>>,
    thread: Mutex<Vec<Message>>,
    thread_failure: Mutex<Option<Option<u16>>>,
    send_failure: Mutex<Option<Option<u16>>>,
    list_gate: Mutex<Option<oneshot::Receiver<()>>>,
    thread_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub sent: Mutex<Vec<SendMessageRequest>>,
    pub list_calls: AtomicUsize,
    pub thread_calls: AtomicUsize,
    pub mark_read_calls: AtomicUsize,
    pub marked: Notify,
}

impl MockService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            conversations: Mutex::new(Reply::Ok(Vec::new())),
            thread: Mutex::new(Vec::new()),
            thread_failure: Mutex::new(None),
            send_failure: Mutex::new(None),
            list_gate: Mutex::new(None),
            thread_gate: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            thread_calls: AtomicUsize::new(0),
            mark_read_calls: AtomicUsize::new(0),
            marked: Notify::new(),
        })
    }

    pub fn set_conversations(&self, reply: Reply<Vec<Value>>) {
        *self.conversations.lock().unwrap() = reply;
    }

    pub fn set_thread(&self, messages: Vec<Message>) {
        *self.thread.lock().unwrap() = messages;
        *self.thread_failure.lock().unwrap() = None;
    }

    pub fn fail_thread(&self, status: Option<u16>) {
        *self.thread_failure.lock().unwrap() = Some(status);
    }

    pub fn fail_sends(&self, status: Option<u16>) {
        *self.send_failure.lock().unwrap() = Some(status);
    }

    /// Block the next conversation list call until the returned sender
    /// fires. The reply is read after the gate opens.
    pub fn hold_next_list(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.list_gate.lock().unwrap() = Some(rx);
        tx
    }

    /// Block the next thread fetch until the returned sender fires.
    pub fn hold_next_thread(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.thread_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn thread_calls(&self) -> usize {
        self.thread_calls.load(Ordering::SeqCst)
    }

    pub fn mark_read_calls(&self) -> usize {
        self.mark_read_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<SendMessageRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageService for MockService {
    async fn list_conversations(&self) -> pawpal_api::Result<Vec<Value>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.list_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match self.conversations.lock().unwrap().clone() {
            Reply::Ok(items) => Ok(items),
            Reply::Fail(status) => Err(failure(status)),
        }
    }

    async fn get_thread(&self, _other: &str, _pet: i64) -> pawpal_api::Result<Vec<Message>> {
        self.thread_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.thread_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(status) = *self.thread_failure.lock().unwrap() {
            return Err(failure(status));
        }
        Ok(self.thread.lock().unwrap().clone())
    }

    async fn send_message(&self, request: &SendMessageRequest) -> pawpal_api::Result<Message> {
        self.sent.lock().unwrap().push(request.clone());
        if let Some(status) = *self.send_failure.lock().unwrap() {
            return Err(failure(status));
        }
        let mut thread = self.thread.lock().unwrap();
        let stored = message(
            &format!("sent-{}", thread.len() + 1),
            ME_ID,
            ME_NAME,
            &request.content,
            false,
        );
        thread.push(stored.clone());
        Ok(stored)
    }

    async fn mark_thread_read(&self, other: &str, _pet: i64) -> pawpal_api::Result<()> {
        self.mark_read_calls.fetch_add(1, Ordering::SeqCst);
        for message in self.thread.lock().unwrap().iter_mut() {
            if message.sender.id == other {
                message.is_read = true;
            }
        }
        self.marked.notify_one();
        Ok(())
    }
}

pub fn signed_in() -> Arc<dyn SessionProvider> {
    Arc::new(StaticSession::signed_in(ME_ID, ME_NAME))
}

pub fn signed_out() -> Arc<dyn SessionProvider> {
    Arc::new(StaticSession::signed_out())
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub fn as_store(store: &Arc<MemoryStore>) -> Arc<dyn KeyValueStore> {
    Arc::clone(store) as Arc<dyn KeyValueStore>
}

pub fn as_service(service: &Arc<MockService>) -> Arc<dyn MessageService> {
    Arc::clone(service) as Arc<dyn MessageService>
}

/// A conversation payload in the server's nested shape.
pub fn conversation(other_id: i64, username: &str, pet_id: i64, pet_name: &str, unread: u64) -> Value {
    json!({
        "other_user": {"id": other_id, "username": username},
        "pet": {"id": pet_id, "name": pet_name},
        "latest_message": {
            "id": format!("m-{}-{}", other_id, pet_id),
            "timestamp": "2026-03-01T10:00:00Z",
            "content": "Is she still available?"
        },
        "unread_count": unread
    })
}

pub fn message(id: &str, sender_id: &str, sender_name: &str, content: &str, read: bool) -> Message {
    Message {
        id: id.into(),
        sender: UserRef {
            id: sender_id.into(),
            username: sender_name.into(),
        },
        content: content.into(),
        timestamp: "2026-03-01T10:00:00Z".into(),
        is_read: read,
    }
}

type Action = Box<dyn FnOnce() + Send>;

/// Runs an action from inside the first WARN event on this thread.
struct OnFirstWarn {
    action: Mutex<Option<Action>>,
}

impl<S: Subscriber> Layer<S> for OnFirstWarn {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let action = self.action.lock().unwrap().take();
        if let Some(action) = action {
            action();
        }
    }
}

/// Install a thread-local subscriber that runs `action` when the first
/// warning is logged. Lets a test act at the exact point a load logs.
pub fn on_first_warn(action: impl FnOnce() + Send + 'static) -> tracing::subscriber::DefaultGuard {
    let layer = OnFirstWarn {
        action: Mutex::new(Some(Box::new(action))),
    };
    tracing::subscriber::set_default(tracing_subscriber::registry().with(layer))
}
