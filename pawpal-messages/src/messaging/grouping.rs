//! Date buckets and sender runs for rendering a chat thread.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use pawpal_api::Message;

/// Label of the bucket for messages whose timestamp cannot be parsed.
pub const UNKNOWN_DATE_LABEL: &str = "Unknown date";

/// A message placed within its sender run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntry {
    pub message: Message,
    /// First message of a run from the same sender.
    pub show_avatar: bool,
    /// Last message of a run; gets extra spacing below it.
    pub ends_run: bool,
}

/// All messages of one calendar day, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateGroup {
    pub label: String,
    pub entries: Vec<MessageEntry>,
}

/// Group messages by local calendar day relative to now.
pub fn group_messages(messages: &[Message]) -> Vec<DateGroup> {
    group_messages_at(messages, &Local::now())
}

/// Group messages by calendar day in `now`'s time zone.
///
/// Buckets appear in order of their first message, and messages keep their
/// input order within a bucket; nothing is re-sorted.
pub fn group_messages_at<Tz: TimeZone>(messages: &[Message], now: &DateTime<Tz>) -> Vec<DateGroup> {
    let today = now.date_naive();
    let mut buckets: Vec<(String, Vec<&Message>)> = Vec::new();

    for message in messages {
        let label = match message_date(&message.timestamp, &now.timezone()) {
            Some(date) => date_label(date, today),
            None => {
                tracing::debug!(
                    "Message {} has unparseable timestamp {:?}",
                    message.id,
                    message.timestamp
                );
                UNKNOWN_DATE_LABEL.to_string()
            }
        };

        match buckets.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, bucket)) => bucket.push(message),
            None => buckets.push((label, vec![message])),
        }
    }

    buckets
        .into_iter()
        .map(|(label, bucket)| DateGroup {
            label,
            entries: mark_runs(&bucket),
        })
        .collect()
}

/// `"Today"`, `"Yesterday"`, or a long-form date such as `"March 5, 2026"`.
pub fn date_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(date) {
        "Yesterday".to_string()
    } else {
        date.format("%B %-d, %Y").to_string()
    }
}

/// Calendar date of an ISO-8601 timestamp in `tz`. Timestamps without an
/// offset are taken as already local.
fn message_date<Tz: TimeZone>(timestamp: &str, tz: &Tz) -> Option<NaiveDate> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(parsed.with_timezone(tz).date_naive());
    }
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.date())
}

fn mark_runs(bucket: &[&Message]) -> Vec<MessageEntry> {
    bucket
        .iter()
        .enumerate()
        .map(|(i, message)| {
            let same_as_previous = i > 0 && bucket[i - 1].sender.id == message.sender.id;
            let same_as_next = bucket
                .get(i + 1)
                .is_some_and(|next| next.sender.id == message.sender.id);
            MessageEntry {
                message: (*message).clone(),
                show_avatar: !same_as_previous,
                ends_run: !same_as_next,
            }
        })
        .collect()
}
