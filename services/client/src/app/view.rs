//! services/client/src/app/view.rs
//!
//! Plain-text rendering of topics, sessions and chat entries for the terminal.

use research_dashboard_core::domain::{
    ChatEntry, ChatRole, ChatSession, DeliveryStatus, TodayTopics, Topic, TopicScores,
};
use std::fmt::Write;

use crate::app::feeds::FeedState;

const BAR_WIDTH: usize = 10;

/// Renders a 0-10 score as a fixed-width bar.
pub fn score_bar(value: f64) -> String {
    let clamped = value.clamp(0.0, 10.0);
    let filled = clamped.round() as usize;
    format!(
        "{}{} {:>4.1}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        clamped
    )
}

pub fn scores(scores: &TopicScores) -> String {
    format!(
        "  Trendiness      {}\n  Technical depth {}\n  Practicality    {}",
        score_bar(scores.trendiness),
        score_bar(scores.technical_depth),
        score_bar(scores.practicality)
    )
}

pub fn topic_card(topic: &Topic, featured: bool) -> String {
    let mut out = String::new();
    let _ = write!(out, "[{}] {}", topic.id, topic.title);
    if featured {
        out.push_str("  * Today's Pick");
    }
    let _ = write!(out, "\n  {}", topic.source);
    if let Some(url) = &topic.source_url {
        let _ = write!(out, " <{}>", url);
    }
    if !topic.summary.is_empty() {
        let _ = write!(out, "\n  {}", topic.summary);
    }
    let _ = write!(out, "\n{}", scores(&topic.scores));
    if !topic.tags.is_empty() {
        let tags: Vec<String> = topic.tags.iter().map(|t| format!("#{}", t)).collect();
        let _ = write!(out, "\n  {}", tags.join(" "));
    }
    out
}

pub fn topic_list(topics: &[Topic]) -> String {
    if topics.is_empty() {
        return "No topics yet.".to_string();
    }
    topics
        .iter()
        .map(|t| topic_card(t, false))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn today_digest(today: &TodayTopics) -> String {
    let mut sections = Vec::new();
    if let Some(date) = today.date {
        sections.push(format!("Topics for {}", date.format("%Y-%m-%d")));
    }
    match &today.featured {
        Some(featured) => sections.push(topic_card(featured, true)),
        None => sections.push("No featured topic today.".to_string()),
    }
    if !today.others.is_empty() {
        sections.push(topic_list(&today.others));
    }
    sections.join("\n\n")
}

pub fn session_line(session: &ChatSession) -> String {
    let title = session
        .title
        .clone()
        .unwrap_or_else(|| format!("Session #{}", session.id));
    let scope = match &session.topic_id {
        Some(topic) => format!("topic {}", topic),
        None => "global".to_string(),
    };
    let archived = if session.is_archived { " (archived)" } else { "" };
    format!(
        "[{}] {} - {} - updated {}{}",
        session.id,
        title,
        scope,
        session.updated_at.format("%Y-%m-%d %H:%M"),
        archived
    )
}

pub fn chat_entry(entry: &ChatEntry) -> String {
    let speaker = match entry.role() {
        ChatRole::User => "you",
        ChatRole::Assistant => "assistant",
    };
    let marker = match entry {
        ChatEntry::Pending(p) if p.status == DeliveryStatus::Failed => " (not delivered)",
        ChatEntry::Pending(p) if p.status == DeliveryStatus::Sending => " (sending)",
        ChatEntry::Pending(_) => "",
        ChatEntry::Confirmed(_) => "",
    };
    format!("{}{}> {}", speaker, marker, entry.content())
}

/// The dashboard home: today's digest followed by the chat sidebar.
pub fn home(today: &FeedState<TodayTopics>, sessions: &FeedState<Vec<ChatSession>>) -> String {
    let mut out = String::new();
    match &today.error {
        Some(error) => out.push_str(error),
        None => out.push_str(&today_digest(&today.data)),
    }
    out.push_str("\n\nRecent chats\n");
    match &sessions.error {
        Some(error) => out.push_str(error),
        None if sessions.data.is_empty() => out.push_str("No chats yet."),
        None => {
            let lines: Vec<String> = sessions.data.iter().map(session_line).collect();
            out.push_str(&lines.join("\n"));
        }
    }
    out
}

/// The client-side opening line of a chat screen.
pub fn chat_greeting(topic: Option<&Topic>) -> String {
    match topic {
        Some(topic) => format!(
            "You are now chatting about the topic: \"{}\". Ask anything about this specific research topic.",
            topic.title
        ),
        None => "This is a global chat across all your collected AI topics. Ask for summaries, comparisons, or trends.".to_string(),
    }
}
