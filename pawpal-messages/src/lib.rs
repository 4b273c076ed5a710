//! PawPal direct messaging.
//!
//! Headless view-models for the inbox and chat screens of the PawPal
//! pet-adoption marketplace. Screens poll the REST API on a fixed interval,
//! suppress updates that change nothing, and keep showing the last good
//! data when the network or the backend fails.

pub mod config;
pub mod constants;
pub mod error;
pub mod i18n;
pub mod messaging;
pub mod scheduler;
pub mod session;
pub mod storage;

pub use config::Config;
pub use error::{ErrorDescriptor, ErrorKind, SendError, ValidationError};
pub use messaging::{InboxViewModel, ThreadRoute, ThreadViewModel, ViewState};
pub use scheduler::{PollOutcome, PollScheduler};
pub use session::{CurrentUser, SessionProvider, StaticSession};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
