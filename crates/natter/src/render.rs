//! Message formatting for the terminal.

use chrono::{Local, TimeZone};

use natter_types::models::{LiveMessage, TopicMessage};

pub const WRAP_WIDTH: usize = 75;
const INDENT: &str = "    ";

/// Greedy word wrap. Words longer than the width get a line of their own,
/// unsplit.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// `[HH:MM]` from a wire timestamp (seconds since the epoch), local time.
/// Falls back to the current time when the wire value is missing or out of
/// range.
pub fn clock(seconds: Option<f64>) -> String {
    let time = seconds
        .and_then(|s| Local.timestamp_opt(s as i64, 0).single())
        .unwrap_or_else(Local::now);
    time.format("[%H:%M]").to_string()
}

/// A live event: `[HH:MM] group-slug/topic-id <user>` plus the wrapped,
/// indented body.
pub fn live_entry(message: &LiveMessage, group_slug: Option<&str>) -> String {
    let topic = message
        .topic
        .as_ref()
        .map_or_else(|| "?".to_string(), |t| t.id.to_string());
    let user = message
        .user
        .as_ref()
        .map_or("?", |u| u.username.as_str());
    let mut text = format!(
        "{} {}/{} <{}>",
        clock(message.created_at),
        group_slug.unwrap_or("?"),
        topic,
        user,
    );
    append_body(&mut text, message.body.as_deref().unwrap_or(""));
    text
}

/// A history entry: `[HH:MM] <user>` plus the wrapped, indented body.
pub fn history_entry(message: &TopicMessage) -> String {
    let user = message
        .user
        .as_ref()
        .map_or("?", |u| u.username.as_str());
    let mut text = format!("{} <{}>", clock(message.created_at), user);
    append_body(&mut text, &message.body);
    text
}

fn append_body(text: &mut String, body: &str) {
    for line in wrap(body, WRAP_WIDTH) {
        text.push('\n');
        text.push_str(INDENT);
        text.push_str(&line);
    }
}
