//! Cheap content fingerprints of item lists.
//!
//! Two lists with equal signatures are treated as the same content, which
//! lets a screen skip replacing its state when a poll returns nothing new.

use pawpal_api::{Conversation, Message};

/// Per-item contribution to a list signature.
pub trait Signature {
    fn signature_part(&self) -> String;
}

/// Order-preserving, comma-joined signature of `items`.
pub fn signature<T: Signature>(items: &[T]) -> String {
    items
        .iter()
        .map(Signature::signature_part)
        .collect::<Vec<_>>()
        .join(",")
}

impl Signature for Conversation {
    fn signature_part(&self) -> String {
        let latest = self.latest_message.as_ref();
        format!(
            "{}:{}:{}:{}:{}",
            self.other_party.id.as_deref().unwrap_or(""),
            self.subject_pet
                .as_ref()
                .map(|pet| pet.id.to_string())
                .unwrap_or_default(),
            latest.and_then(|m| m.id.as_deref()).unwrap_or(""),
            latest.map(|m| m.timestamp.as_str()).unwrap_or(""),
            self.unread_count
        )
    }
}

impl Signature for Message {
    fn signature_part(&self) -> String {
        format!("{}:{}:{}", self.id, self.timestamp, u8::from(self.is_read))
    }
}
