//! Direct messaging screens: the conversation list and the chat thread.

pub mod grouping;
pub mod inbox;
pub mod last_conversation;
pub mod signature;
pub mod state;
pub mod thread;

pub use grouping::{group_messages, group_messages_at, DateGroup, MessageEntry};
pub use inbox::{filter_conversations, prepare_conversations, InboxViewModel};
pub use last_conversation::LastConversation;
pub use signature::{signature, Signature};
pub use state::ViewState;
pub use thread::{has_unread_for, is_own_message, ThreadKey, ThreadRoute, ThreadViewModel};
