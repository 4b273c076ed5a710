//! Centralized constants for intervals, storage keys, and limits.
//!
//! This module provides a single location for the tunable values used
//! throughout the messaging screens. User-facing texts live in the
//! `i18n/` fluent files.

/// Polling constants.
pub mod polling {
    /// Interval between background refreshes of a messaging screen (seconds).
    pub const POLL_INTERVAL_SECS: u64 = 10;
}

/// Persisted key-value storage constants.
pub mod storage {
    /// Key of the last-opened-conversation record.
    pub const LAST_CONVERSATION_KEY: &str = "lastConversation";

    /// Records older than this are treated as absent (days).
    pub const LAST_CONVERSATION_MAX_AGE_DAYS: u64 = 30;

    /// File name of the JSON key-value store inside the data directory.
    pub const STORE_FILE_NAME: &str = "storage.json";
}
