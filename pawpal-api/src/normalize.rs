//! Normalization of conversation payloads.
//!
//! Depending on the endpoint, the server embeds the pet as an object, sends
//! it as a separate `pet_detail` object, sends a bare id, or omits it. The
//! counterpart user appears under `other_user` or `user`, either as an
//! object (keyed by `id` or `pk`) or as a bare id. Each accepted field shape
//! is classified into [`PetShape`] / [`PartyShape`] first and then resolved,
//! so normalization never fails: the worst outcome is a conversation whose
//! identity is unresolved.

use crate::models::{scalar_id, Conversation, LatestMessage, PartyRef, PetRef};
use serde_json::{Map, Value};

/// Payload keys consumed by normalization. Everything else is passed
/// through in [`Conversation::extra`].
const COVERED_KEYS: &[&str] = &[
    "id",
    "other_user",
    "user",
    "pet",
    "pet_detail",
    "latest_message",
    "last_message",
    "unread_count",
];

/// Shape of a `pet` or `pet_detail` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PetShape<'a> {
    /// An object carrying a usable integer id.
    Embedded { id: i64, name: Option<&'a str> },
    /// An object without a usable id; may still carry a display name.
    Nameless { name: Option<&'a str> },
    /// A bare integer id (or a string holding one).
    BareId(i64),
    /// A value that cannot identify a pet, e.g. a non-numeric string.
    Invalid,
    /// Field missing or `null`.
    Absent,
}

impl<'a> PetShape<'a> {
    pub fn classify(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => PetShape::Absent,
            Some(Value::Object(obj)) => {
                let name = obj.get("name").and_then(Value::as_str);
                match obj.get("id").and_then(pet_id) {
                    Some(id) => PetShape::Embedded { id, name },
                    None => PetShape::Nameless { name },
                }
            }
            Some(other) => match pet_id(other) {
                Some(id) => PetShape::BareId(id),
                None => PetShape::Invalid,
            },
        }
    }

    fn embedded(&self) -> Option<PetRef> {
        match self {
            PetShape::Embedded { id, name } => Some(PetRef {
                id: *id,
                name: name.unwrap_or_default().to_string(),
            }),
            _ => None,
        }
    }

    fn name(&self) -> Option<&'a str> {
        match self {
            PetShape::Embedded { name, .. } | PetShape::Nameless { name } => *name,
            _ => None,
        }
    }
}

/// Shape of an `other_user` or `user` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartyShape<'a> {
    /// An object; `id` is resolved from its `id` key, then its `pk` key.
    Object {
        id: Option<String>,
        username: Option<&'a str>,
    },
    /// A bare scalar identifier.
    Scalar(String),
    /// A value that cannot identify a user.
    Invalid,
    /// Field missing or `null`.
    Absent,
}

impl<'a> PartyShape<'a> {
    pub fn classify(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => PartyShape::Absent,
            Some(Value::Object(obj)) => PartyShape::Object {
                id: obj
                    .get("id")
                    .and_then(scalar_id)
                    .or_else(|| obj.get("pk").and_then(scalar_id)),
                username: obj.get("username").and_then(Value::as_str),
            },
            Some(other) => match scalar_id(other) {
                Some(id) => PartyShape::Scalar(id),
                None => PartyShape::Invalid,
            },
        }
    }

    fn id(&self) -> Option<String> {
        match self {
            PartyShape::Object { id, .. } => id.clone(),
            PartyShape::Scalar(id) => Some(id.clone()),
            PartyShape::Invalid | PartyShape::Absent => None,
        }
    }

    fn username(&self) -> Option<&'a str> {
        match self {
            PartyShape::Object { username, .. } => *username,
            _ => None,
        }
    }
}

/// Convert a raw conversation payload into its canonical shape.
///
/// Never fails. A non-object payload yields an empty conversation with no
/// identity, which callers drop.
pub fn normalize(raw: &Value) -> Conversation {
    let Some(obj) = raw.as_object() else {
        tracing::debug!("Conversation payload is not an object: {}", raw);
        return Conversation::default();
    };

    Conversation {
        id: obj.get("id").and_then(scalar_id),
        other_party: resolve_party(obj),
        subject_pet: resolve_pet(obj),
        latest_message: obj
            .get("latest_message")
            .or_else(|| obj.get("last_message"))
            .and_then(resolve_latest_message),
        unread_count: obj.get("unread_count").map(count).unwrap_or(0),
        extra: obj
            .iter()
            .filter(|(key, _)| !COVERED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}

/// Pet resolution order: embedded object, then `pet_detail`, then a bare id
/// named after `pet_detail` when it carries a name.
fn resolve_pet(obj: &Map<String, Value>) -> Option<PetRef> {
    let pet = PetShape::classify(obj.get("pet"));
    let detail = PetShape::classify(obj.get("pet_detail"));

    if let Some(resolved) = pet.embedded().or_else(|| detail.embedded()) {
        return Some(resolved);
    }

    match pet {
        PetShape::BareId(id) => Some(PetRef {
            id,
            name: detail.name().unwrap_or_default().to_string(),
        }),
        _ => None,
    }
}

/// Counterpart resolution: `other_user` before `user`; the first shape that
/// yields an id wins, and the username comes from the first object that
/// has one.
fn resolve_party(obj: &Map<String, Value>) -> PartyRef {
    let shapes = [
        PartyShape::classify(obj.get("other_user")),
        PartyShape::classify(obj.get("user")),
    ];

    PartyRef {
        id: shapes.iter().find_map(PartyShape::id),
        username: shapes
            .iter()
            .find_map(PartyShape::username)
            .unwrap_or_default()
            .to_string(),
    }
}

fn resolve_latest_message(value: &Value) -> Option<LatestMessage> {
    let obj = value.as_object()?;
    Some(LatestMessage {
        id: obj.get("id").and_then(scalar_id),
        timestamp: obj
            .get("timestamp")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        content: obj
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Extract an integer pet id from a number or a numeric string.
fn pet_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
