//! Observable state of a messaging screen.

use crate::error::ErrorDescriptor;
use crate::messaging::signature::{signature, Signature};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// What a screen renders.
#[derive(Debug, Clone)]
pub struct ViewState<T> {
    /// Shared so that an unchanged poll keeps the same allocation.
    pub items: Arc<Vec<T>>,
    /// True only during the first load of the screen.
    pub loading: bool,
    /// Last fetch failure. `items` still holds the last good data.
    pub error: Option<ErrorDescriptor>,
    pub last_signature: String,
    /// No user is signed in; nothing is fetched.
    pub signed_out: bool,
    /// Transient notification, e.g. a failed send.
    pub notice: Option<String>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            loading: false,
            error: None,
            last_signature: String::new(),
            signed_out: false,
            notice: None,
        }
    }
}

impl<T> ViewState<T> {
    /// Items are shown from before the last failed refresh.
    pub fn is_stale(&self) -> bool {
        self.error.is_some() && !self.items.is_empty()
    }

    /// The first load failed and there is nothing to show.
    pub fn is_unavailable(&self) -> bool {
        !self.loading && self.error.is_some() && self.items.is_empty()
    }
}

/// Owner side of a screen's state.
///
/// Updates go through `watch::Sender::send_if_modified`, so subscribers are
/// only woken by real changes. Once [`close`](Self::close) returns, no
/// update is applied: the closed flag is checked and set while the watch
/// write lock is held, so a write racing with `close` either lands before
/// it or not at all.
#[derive(Debug)]
pub(crate) struct ViewStateCell<T> {
    sender: watch::Sender<ViewState<T>>,
    settled: AtomicBool,
    closed: AtomicBool,
}

impl<T> ViewStateCell<T>
where
    T: Signature,
{
    pub(crate) fn new() -> Self {
        let (sender, _) = watch::channel(ViewState::default());
        Self {
            sender,
            settled: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn snapshot(&self) -> ViewState<T>
    where
        T: Clone,
    {
        self.sender.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ViewState<T>> {
        self.sender.subscribe()
    }

    /// Refuse all further updates. Returns `true` on the first call.
    pub(crate) fn close(&self) -> bool {
        let mut first = false;
        self.sender.send_if_modified(|_| {
            first = !self.closed.swap(true, Ordering::SeqCst);
            false
        });
        first
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Run `update` under the write lock unless the cell is closed.
    fn update(&self, update: impl FnOnce(&mut ViewState<T>) -> bool) -> bool {
        let mut applied = false;
        self.sender.send_if_modified(|state| {
            if self.closed.load(Ordering::SeqCst) {
                return false;
            }
            applied = true;
            update(state)
        });
        applied
    }

    /// Enter the loading state, unless a first load already completed.
    pub(crate) fn begin_first_load(&self) {
        if self.settled.load(Ordering::SeqCst) {
            return;
        }
        self.update(|state| {
            let changed = !state.loading;
            state.loading = true;
            changed
        });
    }

    /// Apply a successful fetch. Items are replaced only when their
    /// signature differs; returns whether they were.
    pub(crate) fn apply_items(&self, items: Vec<T>) -> bool {
        let new_signature = signature(&items);
        let mut replaced = false;

        let applied = self.update(|state| {
            let mut changed = settle(state);
            if state.error.take().is_some() {
                changed = true;
            }
            if state.last_signature != new_signature {
                state.items = Arc::new(items);
                state.last_signature = new_signature;
                replaced = true;
                changed = true;
            }
            changed
        });
        if applied {
            self.settled.store(true, Ordering::SeqCst);
        }

        replaced
    }

    /// Record a failed fetch, keeping the current items.
    pub(crate) fn apply_error(&self, error: ErrorDescriptor) {
        let applied = self.update(|state| {
            let mut changed = settle(state);
            if state.error.as_ref() != Some(&error) {
                state.error = Some(error);
                changed = true;
            }
            changed
        });
        if applied {
            self.settled.store(true, Ordering::SeqCst);
        }
    }

    pub(crate) fn apply_signed_out(&self) {
        let applied = self.update(|state| {
            let changed = state.loading || !state.signed_out;
            state.loading = false;
            state.signed_out = true;
            changed
        });
        if applied {
            self.settled.store(true, Ordering::SeqCst);
        }
    }

    pub(crate) fn clear_error(&self) {
        self.update(|state| state.error.take().is_some());
    }

    pub(crate) fn set_notice(&self, notice: Option<String>) {
        self.update(|state| {
            if state.notice == notice {
                return false;
            }
            state.notice = notice;
            true
        });
    }
}

/// Leave the first-load and signed-out states.
fn settle<T>(state: &mut ViewState<T>) -> bool {
    let changed = state.loading || state.signed_out;
    state.loading = false;
    state.signed_out = false;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pawpal_api::{Message, UserRef};

    fn message(id: &str) -> Message {
        Message {
            id: id.into(),
            sender: UserRef {
                id: "1".into(),
                username: "a".into(),
            },
            content: "hello".into(),
            timestamp: "2026-03-01T10:00:00Z".into(),
            is_read: true,
        }
    }

    fn network_error() -> ErrorDescriptor {
        ErrorDescriptor {
            kind: ErrorKind::Network,
            message: "offline".into(),
        }
    }

    #[test]
    fn test_identical_items_keep_allocation() {
        let cell = ViewStateCell::new();
        assert!(cell.apply_items(vec![message("1")]));
        let before = cell.snapshot().items;

        assert!(!cell.apply_items(vec![message("1")]));
        assert!(Arc::ptr_eq(&before, &cell.snapshot().items));

        assert!(cell.apply_items(vec![message("1"), message("2")]));
        assert!(!Arc::ptr_eq(&before, &cell.snapshot().items));
    }

    #[test]
    fn test_unchanged_poll_does_not_notify() {
        let cell = ViewStateCell::new();
        cell.apply_items(vec![message("1")]);
        let mut receiver = cell.subscribe();
        receiver.mark_unchanged();

        cell.apply_items(vec![message("1")]);
        assert!(!receiver.has_changed().unwrap());

        cell.apply_items(vec![message("2")]);
        assert!(receiver.has_changed().unwrap());
    }

    #[test]
    fn test_loading_only_before_first_result() {
        let cell: ViewStateCell<Message> = ViewStateCell::new();
        assert!(!cell.snapshot().loading);

        cell.begin_first_load();
        assert!(cell.snapshot().loading);

        cell.apply_error(network_error());
        assert!(!cell.snapshot().loading);
        assert!(cell.snapshot().is_unavailable());

        cell.begin_first_load();
        assert!(!cell.snapshot().loading);
    }

    #[test]
    fn test_error_keeps_items_until_next_success() {
        let cell = ViewStateCell::new();
        cell.apply_items(vec![message("1")]);
        cell.apply_error(network_error());

        let state = cell.snapshot();
        assert_eq!(state.items.len(), 1);
        assert!(state.is_stale());

        cell.apply_items(vec![message("1")]);
        assert!(cell.snapshot().error.is_none());
    }

    #[test]
    fn test_closed_cell_ignores_updates() {
        let cell = ViewStateCell::new();
        cell.apply_items(vec![message("1")]);
        let mut receiver = cell.subscribe();
        receiver.mark_unchanged();

        assert!(cell.close());
        assert!(!cell.close());
        assert!(cell.is_closed());

        assert!(!cell.apply_items(vec![message("2")]));
        cell.apply_error(network_error());
        cell.set_notice(Some("late".into()));
        cell.apply_signed_out();

        let state = cell.snapshot();
        assert_eq!(state.items[0].id, "1");
        assert!(state.error.is_none());
        assert!(state.notice.is_none());
        assert!(!state.signed_out);
        assert!(!receiver.has_changed().unwrap());
    }
}
