//! Client-side access to the PawPal messaging REST API.
//!
//! Provides the wire models for conversations and messages, the
//! normalization of the loosely shaped conversation payloads the server
//! returns, and the [`MessageService`] transport trait with its HTTP
//! implementation.

pub mod error;
pub mod models;
pub mod normalize;
pub mod service;

pub use error::{ApiError, Result};
pub use models::{Conversation, LatestMessage, Message, PartyRef, PetRef, SendMessageRequest, UserRef};
pub use normalize::{normalize, PartyShape, PetShape};
pub use service::{HttpMessageService, MessageService};
