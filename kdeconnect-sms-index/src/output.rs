//! Rendering of query results for the terminal.

use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};
use kdeconnect_sms::{Message, ThreadId, ThreadIndex};
use serde::Serialize;

/// A message paired with the thread it was filed under.
#[derive(Debug, Serialize)]
struct ThreadEntry<'a> {
    thread_id: ThreadId,
    #[serde(flatten)]
    message: &'a Message,
}

#[derive(Debug, Serialize)]
struct ThreadMessages<'a> {
    thread_id: ThreadId,
    messages: &'a [Message],
}

/// Format a millisecond timestamp in local time.
pub fn format_date(message: &Message) -> String {
    message
        .timestamp_ms()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One line of text for a message.
pub fn message_line(message: &Message) -> String {
    format!(
        "{}  {}  {}",
        format_date(message),
        message.address.as_deref().unwrap_or("Unknown"),
        message
    )
}

/// Conversations, newest first. Threads without a readable date go last.
pub fn render_conversations(index: &ThreadIndex, json: bool) -> serde_json::Result<String> {
    let mut entries: Vec<ThreadEntry<'_>> = index
        .iter()
        .map(|(&thread_id, message)| ThreadEntry { thread_id, message })
        .collect();
    entries.sort_by(|a, b| {
        b.message
            .timestamp_ms()
            .cmp(&a.message.timestamp_ms())
            .then(a.thread_id.cmp(&b.thread_id))
    });

    if json {
        return serde_json::to_string_pretty(&entries);
    }
    Ok(entries
        .iter()
        .map(|e| format!("[{}] {}", e.thread_id, message_line(e.message)))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Messages of a single thread, in the order given.
pub fn render_thread(
    thread_id: ThreadId,
    messages: &[Message],
    json: bool,
) -> serde_json::Result<String> {
    if json {
        return serde_json::to_string_pretty(&ThreadMessages {
            thread_id,
            messages,
        });
    }
    if messages.is_empty() {
        return Ok(format!("No messages in thread {thread_id}"));
    }
    Ok(messages
        .iter()
        .map(message_line)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// All threads, ordered by thread id.
pub fn render_threads(
    threads: &HashMap<ThreadId, Vec<Message>>,
    json: bool,
) -> serde_json::Result<String> {
    let mut ids: Vec<ThreadId> = threads.keys().copied().collect();
    ids.sort();

    if json {
        let grouped: Vec<ThreadMessages<'_>> = ids
            .iter()
            .map(|&thread_id| ThreadMessages {
                thread_id,
                messages: &threads[&thread_id],
            })
            .collect();
        return serde_json::to_string_pretty(&grouped);
    }

    let mut out = Vec::new();
    for thread_id in ids {
        let messages = &threads[&thread_id];
        out.push(format!("Thread {} ({} messages)", thread_id, messages.len()));
        out.extend(messages.iter().map(|m| format!("  {}", message_line(m))));
    }
    Ok(out.join("\n"))
}
