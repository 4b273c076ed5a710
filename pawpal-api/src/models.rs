//! Wire models for conversations and messages.
//!
//! Identifiers of users and messages are opaque: the server may send them as
//! UUID strings or as integers, and both are stored as `String`. Pet ids are
//! always integers.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A user reference as it appears on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
}

/// The counterpart of a conversation.
///
/// `id` is `None` when no identifier could be resolved from the payload;
/// such conversations are unrenderable and get filtered out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartyRef {
    pub id: Option<String>,
    pub username: String,
}

/// The pet a conversation is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// Preview of the most recent message of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LatestMessage {
    pub id: Option<String>,
    pub timestamp: String,
    pub content: String,
}

/// A conversation in canonical shape, as produced by [`crate::normalize`].
///
/// Serializes back into the field names the server uses, so a normalized
/// conversation can be fed through normalization again unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Conversation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "other_user")]
    pub other_party: PartyRef,
    #[serde(rename = "pet")]
    pub subject_pet: Option<PetRef>,
    pub latest_message: Option<LatestMessage>,
    pub unread_count: u64,
    /// Payload fields not covered by normalization, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Conversation {
    /// The `(counterpart id, pet id)` pair identifying this conversation,
    /// or `None` when either part is missing.
    pub fn identity(&self) -> Option<(&str, i64)> {
        let other = self.other_party.id.as_deref()?;
        let pet = self.subject_pet.as_ref()?;
        Some((other, pet.id))
    }

    /// Key for list rendering. Prefers the server-assigned id.
    pub fn render_key(&self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }
        match self.identity() {
            Some((other, pet)) => format!("{}-{}", other, pet),
            None => String::new(),
        }
    }

    /// Display name of the subject pet, empty when unknown.
    pub fn pet_name(&self) -> &str {
        self.subject_pet
            .as_ref()
            .map(|pet| pet.name.as_str())
            .unwrap_or("")
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub sender: UserRef,
    #[serde(default)]
    pub content: String,
    /// ISO-8601 timestamp.
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, alias = "read")]
    pub is_read: bool,
}

/// Body of a send-message request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendMessageRequest {
    #[serde(rename = "receiver")]
    pub receiver_username: String,
    #[serde(rename = "pet")]
    pub subject_pet_id: i64,
    pub content: String,
}

/// Coerce a scalar JSON identifier into its string form.
///
/// Accepts non-empty strings and integers; everything else is rejected.
pub(crate) fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_id(&value)
        .ok_or_else(|| D::Error::custom(format!("expected string or integer id, got {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_accepts_numeric_and_uuid_ids() {
        let numeric: Message = serde_json::from_value(json!({
            "id": 17,
            "sender": {"id": 4, "username": "maria"},
            "content": "Is Biscuit still available?",
            "timestamp": "2026-03-01T10:00:00Z",
            "is_read": false
        }))
        .unwrap();
        assert_eq!(numeric.id, "17");
        assert_eq!(numeric.sender.id, "4");

        let uuid: Message = serde_json::from_value(json!({
            "id": "9b2f0e0c-4d1e-4a47-9d6e-0d6b6c4f1a11",
            "sender": {"id": "c0ffee00-0000-4000-8000-000000000001", "username": "li"},
            "content": "yes",
            "timestamp": "2026-03-01T10:05:00Z",
            "read": true
        }))
        .unwrap();
        assert_eq!(uuid.sender.id, "c0ffee00-0000-4000-8000-000000000001");
        assert!(uuid.is_read);
    }

    #[test]
    fn test_message_rejects_missing_id() {
        let result: Result<Message, _> = serde_json::from_value(json!({
            "id": null,
            "sender": {"id": 1, "username": "a"}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_send_request_wire_names() {
        let request = SendMessageRequest {
            receiver_username: "maria".into(),
            subject_pet_id: 12,
            content: "hello".into(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"receiver": "maria", "pet": 12, "content": "hello"})
        );
    }

    #[test]
    fn test_render_key_prefers_explicit_id() {
        let mut conversation = Conversation {
            other_party: PartyRef {
                id: Some("7".into()),
                username: "sam".into(),
            },
            subject_pet: Some(PetRef {
                id: 3,
                name: "Rex".into(),
            }),
            ..Default::default()
        };
        assert_eq!(conversation.render_key(), "7-3");
        conversation.id = Some("conv-1".into());
        assert_eq!(conversation.render_key(), "conv-1");
    }
}
