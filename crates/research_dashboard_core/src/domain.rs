//! crates/research_dashboard_core/src/domain.rs
//!
//! Defines the pure, core data structures for the dashboard client.
//! These structs are independent of the HTTP API and its serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Identifiers
//=========================================================================================

// The server issues numeric ids, but the client never does arithmetic on them.
macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

opaque_id!(
    /// Identifies a research topic.
    TopicId
);
opaque_id!(
    /// Identifies a server-side conversation thread.
    SessionId
);
opaque_id!(
    /// Identifies a message issued by the server.
    MessageId
);

//=========================================================================================
// Topics
//=========================================================================================

/// The three quality axes every topic is scored on.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TopicScores {
    pub trendiness: f64,
    pub technical_depth: f64,
    pub practicality: f64,
}

/// A single research item, read-only from the client's perspective.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub id: TopicId,
    pub title: String,
    pub summary: String,
    /// e.g. "arXiv", "Substack"
    pub source: String,
    pub source_url: Option<String>,
    pub date: Option<NaiveDate>,
    pub scores: TopicScores,
    pub tags: Vec<String>,
}

/// The daily digest shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TodayTopics {
    pub date: Option<NaiveDate>,
    pub featured: Option<Topic>,
    pub others: Vec<Topic>,
}

/// Column a topic listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicSort {
    Trendiness,
    TechnicalDepth,
    Practicality,
    CreatedAt,
}

impl TopicSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicSort::Trendiness => "trendiness",
            TopicSort::TechnicalDepth => "technical_depth",
            TopicSort::Practicality => "practicality",
            TopicSort::CreatedAt => "created_at",
        }
    }
}

/// Optional filters for a topic listing. The default query has no filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicQuery {
    pub tag: Option<String>,
    pub search: Option<String>,
    pub date: Option<NaiveDate>,
    pub sort_by: Option<TopicSort>,
    pub ascending: Option<bool>,
}

impl TopicQuery {
    /// Renders the query as `(key, value)` pairs, omitting unset filters.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(tag) = &self.tag {
            pairs.push(("tag", tag.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(date) = &self.date {
            pairs.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sort_by", sort_by.as_str().to_string()));
        }
        if let Some(ascending) = self.ascending {
            let order = if ascending { "asc" } else { "desc" };
            pairs.push(("order", order.to_string()));
        }
        pairs
    }
}

//=========================================================================================
// Chat
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// Whether a session is scoped to a topic or spans all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Global,
    Topic,
}

impl SessionMode {
    pub fn for_topic(topic_id: Option<&TopicId>) -> Self {
        match topic_id {
            Some(_) => SessionMode::Topic,
            None => SessionMode::Global,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Global => "global",
            SessionMode::Topic => "topic",
        }
    }
}

/// A conversation thread as stored by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub id: SessionId,
    pub mode: SessionMode,
    pub title: Option<String>,
    /// `None` means a global chat.
    pub topic_id: Option<TopicId>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message confirmed by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub session_id: Option<SessionId>,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The result of posting one user message: the session plus the new messages.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub session: ChatSession,
    pub messages: Vec<ChatMessage>,
}

impl ChatTurn {
    /// The assistant's reply: the first assistant-role message, or the last
    /// message when none carries that role.
    pub fn reply(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .find(|m| m.role == ChatRole::Assistant)
            .or_else(|| self.messages.last())
    }

    /// The server's canonical copy of the user's message, if it was echoed.
    pub fn user_echo(&self) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.role == ChatRole::User)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sending,
    /// Accepted, but the server's copy was not matched to this entry.
    Delivered,
    Failed,
}

/// A user message shown before the server has acknowledged it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    pub local_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub status: DeliveryStatus,
}

impl PendingMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            local_id: format!("local-{}", Uuid::new_v4()),
            content: content.into(),
            created_at: Utc::now(),
            status: DeliveryStatus::Sending,
        }
    }
}

/// One row of a conversation as held by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEntry {
    Pending(PendingMessage),
    Confirmed(ChatMessage),
}

impl ChatEntry {
    pub fn id(&self) -> &str {
        match self {
            ChatEntry::Pending(p) => &p.local_id,
            ChatEntry::Confirmed(m) => m.id.as_str(),
        }
    }

    pub fn role(&self) -> ChatRole {
        match self {
            ChatEntry::Pending(_) => ChatRole::User,
            ChatEntry::Confirmed(m) => m.role,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChatEntry::Pending(p) => &p.content,
            ChatEntry::Confirmed(m) => &m.content,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ChatEntry::Pending(_))
    }
}

//=========================================================================================
// Auth
//=========================================================================================

/// Credentials entered on the login screen.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A bearer token issued by `/auth/login`.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub token: String,
    pub token_type: String,
}

/// A user account as returned by registration.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub is_active: bool,
}

/// What the client persists between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub access_token: Option<String>,
    pub is_authenticated: bool,
}
