//! crates/research_dashboard_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client logic is written against.
//! These traits form the boundary between the chat/feed state and the concrete
//! HTTP API and storage implementations.

use async_trait::async_trait;
use crate::domain::{
    AccessToken, AuthState, ChatMessage, ChatSession, ChatTurn, Credentials, SessionId,
    TodayTopics, Topic, TopicId, TopicQuery, User,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The server answered with a non-2xx status.
    #[error("API request failed with status {status}")]
    Api {
        status: u16,
        /// The raw response body, if one was received.
        body: Option<String>,
        /// The `detail` message of a JSON error body.
        detail: Option<String>,
    },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Failed to decode response: {0}")]
    Decode(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The HTTP status for API failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            PortError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DashboardApi: Send + Sync {
    // --- Auth ---
    async fn register(&self, credentials: &Credentials) -> PortResult<User>;

    async fn login(&self, credentials: &Credentials) -> PortResult<AccessToken>;

    // --- Topics ---
    async fn list_topics(&self, query: &TopicQuery) -> PortResult<Vec<Topic>>;

    async fn today_topics(&self) -> PortResult<TodayTopics>;

    async fn get_topic(&self, topic_id: &TopicId) -> PortResult<Topic>;

    // --- Chat Sessions ---
    async fn list_sessions(&self) -> PortResult<Vec<ChatSession>>;

    /// Fetches one session, including archived ones the list leaves out.
    async fn get_session(&self, session_id: &SessionId) -> PortResult<ChatSession>;

    /// Creates a session; `None` creates a global chat.
    async fn create_session(
        &self,
        topic_id: Option<&TopicId>,
        title: Option<&str>,
    ) -> PortResult<ChatSession>;

    async fn archive_session(&self, session_id: &SessionId) -> PortResult<()>;

    // --- Messages ---
    async fn list_messages(&self, session_id: &SessionId) -> PortResult<Vec<ChatMessage>>;

    async fn send_message(&self, session_id: &SessionId, content: &str) -> PortResult<ChatTurn>;
}

/// Persists the authentication flag and token between runs.
pub trait AuthStore: Send + Sync {
    /// Loads the stored state; a missing store yields the default state.
    fn load(&self) -> PortResult<AuthState>;

    fn save(&self, state: &AuthState) -> PortResult<()>;

    fn clear(&self) -> PortResult<()>;
}
