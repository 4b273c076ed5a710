//! The last-opened-conversation record.
//!
//! Written whenever a valid conversation is viewed or messaged, and read
//! back only as a fallback when the conversation list cannot be shown.
//! A missing, malformed, or stale record reads as absent.

use crate::constants::storage::LAST_CONVERSATION_KEY;
use crate::storage::KeyValueStore;
use chrono::Utc;
use pawpal_api::{PetRef, UserRef};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastConversation {
    pub other_party: UserRef,
    pub subject_pet: PetRef,
    /// Unix time in milliseconds.
    pub saved_at: i64,
}

impl LastConversation {
    /// A record stamped with the current time.
    pub fn new(other_party: UserRef, subject_pet: PetRef) -> Self {
        Self {
            other_party,
            subject_pet,
            saved_at: Utc::now().timestamp_millis(),
        }
    }

    fn is_valid(&self) -> bool {
        !self.other_party.id.trim().is_empty() && !self.other_party.username.trim().is_empty()
    }
}

/// Replace the stored record.
pub fn remember(store: &dyn KeyValueStore, record: &LastConversation) {
    match serde_json::to_string(record) {
        Ok(json) => {
            store.set(LAST_CONVERSATION_KEY, &json);
            tracing::debug!(
                "Remembered conversation with {} about pet {}",
                record.other_party.id,
                record.subject_pet.id
            );
        }
        Err(e) => tracing::warn!("Failed to serialize last conversation: {}", e),
    }
}

/// Read the stored record if it is present, well-formed, and younger than
/// `max_age`.
pub fn recall(store: &dyn KeyValueStore, max_age: Duration) -> Option<LastConversation> {
    recall_at(store, max_age, Utc::now().timestamp_millis())
}

pub fn recall_at(
    store: &dyn KeyValueStore,
    max_age: Duration,
    now_ms: i64,
) -> Option<LastConversation> {
    let raw = store.get(LAST_CONVERSATION_KEY)?;
    let record: LastConversation = match serde_json::from_str(&raw) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!("Ignoring malformed last conversation record: {}", e);
            return None;
        }
    };

    if !record.is_valid() {
        tracing::debug!("Ignoring last conversation record without a user id or username");
        return None;
    }

    let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
    if now_ms.saturating_sub(record.saved_at) > max_age_ms {
        tracing::debug!("Ignoring stale last conversation record");
        return None;
    }

    Some(record)
}
