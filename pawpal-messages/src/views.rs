//! Plain-text rendering of the messaging screens.

use chrono::{DateTime, Local};
use pawpal_api::{Conversation, Message};
use pawpal_messages::messaging::{is_own_message, DateGroup, LastConversation};
use pawpal_messages::{fl, CurrentUser, ViewState};
use std::fmt::Write;

/// Format an ISO-8601 timestamp for display.
fn format_timestamp(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => {
            let dt = dt.with_timezone(&Local);
            if dt.date_naive() == Local::now().date_naive() {
                dt.format("%H:%M").to_string()
            } else {
                dt.format("%b %d").to_string()
            }
        }
        Err(_) => String::new(),
    }
}

pub fn render_inbox(
    state: &ViewState<Conversation>,
    conversations: &[Conversation],
    fallback: Option<&LastConversation>,
) -> String {
    let mut out = String::new();

    if state.signed_out {
        return fl!("signed-out");
    }
    if state.loading {
        return fl!("loading-conversations");
    }

    if let Some(error) = &state.error {
        let _ = writeln!(out, "! {}", error.message);
        if state.is_stale() {
            let _ = writeln!(out, "! {}", fl!("stale-conversations"));
        }
        let _ = writeln!(out, "! {}", fl!("retry-hint"));
    }

    if conversations.is_empty() {
        let _ = writeln!(out, "{}", fl!("no-conversations"));
    }

    for conversation in conversations {
        let (preview, time) = conversation
            .latest_message
            .as_ref()
            .map(|m| (m.content.as_str(), format_timestamp(&m.timestamp)))
            .unwrap_or(("", String::new()));
        let unread = if conversation.unread_count > 0 {
            format!(" ({} new)", conversation.unread_count)
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "{} about {}{}  {}\n    {}",
            conversation.other_party.username,
            conversation.pet_name(),
            unread,
            time,
            preview
        );
    }

    if let Some(last) = fallback {
        let text = fl!(
            "continue-conversation",
            username = last.other_party.username.as_str(),
            pet = last.subject_pet.name.as_str(),
            user_id = last.other_party.id.as_str(),
            pet_id = last.subject_pet.id.to_string()
        );
        let _ = writeln!(out, "{}", text);
    }

    out
}

pub fn render_thread(
    state: &ViewState<Message>,
    groups: &[DateGroup],
    current_user: Option<&CurrentUser>,
) -> String {
    let mut out = String::new();

    if state.signed_out {
        return fl!("signed-out");
    }
    if state.loading {
        return fl!("loading-messages");
    }
    if state.is_unavailable() {
        return fl!("conversation-unavailable");
    }
    if let Some(error) = &state.error {
        let _ = writeln!(out, "! {}", error.message);
    }

    for group in groups {
        let _ = writeln!(out, "-- {} --", group.label);
        for entry in &group.entries {
            let own = current_user.is_some_and(|user| is_own_message(&entry.message, user));
            let author = if entry.show_avatar {
                format!("[{}] ", entry.message.sender.username)
            } else {
                String::new()
            };
            let mut line = format!("{}{}", author, entry.message.content);
            let time = format_timestamp(&entry.message.timestamp);
            if !time.is_empty() {
                line.push_str("  ");
                line.push_str(&time);
            }
            if own {
                let _ = writeln!(out, "{:>60}", line);
            } else {
                let _ = writeln!(out, "{}", line);
            }
            if entry.ends_run {
                out.push('\n');
            }
        }
    }

    if let Some(notice) = &state.notice {
        let _ = writeln!(out, "! {}", notice);
    }

    out
}
