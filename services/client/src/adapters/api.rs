//! services/client/src/adapters/api.rs
//!
//! This module contains the HTTP adapter, which is the concrete implementation
//! of the `DashboardApi` port from the `core` crate. It owns the wire records the
//! backend speaks and converts them into domain types.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use research_dashboard_core::domain::{
    AccessToken, ChatMessage, ChatRole, ChatSession, ChatTurn, Credentials, MessageId,
    SessionId, SessionMode, TodayTopics, Topic, TopicId, TopicQuery, TopicScores, User,
};
use research_dashboard_core::ports::{DashboardApi, PortResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adapters::transport::{path_segment, HttpTransport};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An HTTP adapter that implements the `DashboardApi` port.
#[derive(Clone)]
pub struct HttpDashboardApi {
    transport: HttpTransport,
}

impl HttpDashboardApi {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

//=========================================================================================
// Identifiers on the Wire
//=========================================================================================

/// The backend uses integer ids; anything else is passed through as text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum WireId {
    Int(i64),
    Text(String),
}

impl WireId {
    fn from_client(id: &str) -> Self {
        id.parse::<i64>()
            .map(WireId::Int)
            .unwrap_or_else(|_| WireId::Text(id.to_string()))
    }

    fn into_string(self) -> String {
        match self {
            WireId::Int(id) => id.to_string(),
            WireId::Text(id) => id,
        }
    }
}

/// Timestamps are sometimes emitted without an offset; those are UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }
}

//=========================================================================================
// Request Bodies
//=========================================================================================

#[derive(Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

impl<'a> CredentialsBody<'a> {
    fn from_domain(credentials: &'a Credentials) -> Self {
        Self {
            email: &credentials.email,
            password: &credentials.password,
        }
    }
}

#[derive(Serialize)]
struct CreateSessionBody<'a> {
    mode: &'static str,
    topic_id: Option<WireId>,
    title: Option<&'a str>,
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    content: &'a str,
}

//=========================================================================================
// Response Records
//=========================================================================================

#[derive(Deserialize)]
struct TokenRecord {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenRecord {
    fn to_domain(self) -> AccessToken {
        AccessToken {
            token: self.access_token,
            token_type: self.token_type,
        }
    }
}

#[derive(Deserialize)]
struct UserRecord {
    id: WireId,
    email: String,
    #[serde(default = "default_true")]
    is_active: bool,
}

fn default_true() -> bool {
    true
}

impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id.into_string(),
            email: self.email,
            is_active: self.is_active,
        }
    }
}

#[derive(Deserialize, Default)]
struct ScoresRecord {
    #[serde(default)]
    trendiness: f64,
    #[serde(default, alias = "technicalDepth")]
    technical_depth: f64,
    #[serde(default)]
    practicality: f64,
}

#[derive(Deserialize)]
struct TopicRecord {
    id: WireId,
    title: String,
    #[serde(default, alias = "summary")]
    short_summary: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    scores: ScoresRecord,
}

impl TopicRecord {
    fn to_domain(self) -> Topic {
        Topic {
            id: TopicId::new(self.id.into_string()),
            title: self.title,
            summary: self.short_summary,
            source: self.source,
            source_url: self.source_url,
            date: self.date,
            scores: TopicScores {
                trendiness: self.scores.trendiness,
                technical_depth: self.scores.technical_depth,
                practicality: self.scores.practicality,
            },
            tags: self.tags,
        }
    }
}

#[derive(Deserialize)]
struct TodayRecord {
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    featured: Option<TopicRecord>,
    #[serde(default)]
    others: Option<Vec<TopicRecord>>,
}

impl TodayRecord {
    fn to_domain(self) -> TodayTopics {
        TodayTopics {
            date: self.date,
            featured: self.featured.map(TopicRecord::to_domain),
            others: self
                .others
                .unwrap_or_default()
                .into_iter()
                .map(TopicRecord::to_domain)
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct SessionRecord {
    id: WireId,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    topic_id: Option<WireId>,
    #[serde(default)]
    is_archived: bool,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    updated_at: DateTime<Utc>,
}

impl SessionRecord {
    fn to_domain(self) -> ChatSession {
        let topic_id = self.topic_id.map(|id| TopicId::new(id.into_string()));
        let mode = match self.mode.as_deref() {
            Some("topic") => SessionMode::Topic,
            Some("global") => SessionMode::Global,
            _ => SessionMode::for_topic(topic_id.as_ref()),
        };
        ChatSession {
            id: SessionId::new(self.id.into_string()),
            mode,
            title: self.title,
            topic_id,
            is_archived: self.is_archived,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Deserialize)]
struct MessageRecord {
    id: WireId,
    #[serde(default)]
    session_id: Option<WireId>,
    role: String,
    content: String,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
}

impl MessageRecord {
    fn to_domain(self) -> ChatMessage {
        let role = match self.role.as_str() {
            "user" => ChatRole::User,
            "assistant" => ChatRole::Assistant,
            other => {
                warn!("Treating unknown message role '{}' as assistant", other);
                ChatRole::Assistant
            }
        };
        ChatMessage {
            id: MessageId::new(self.id.into_string()),
            session_id: self.session_id.map(|id| SessionId::new(id.into_string())),
            role,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[derive(Deserialize)]
struct TurnRecord {
    session: SessionRecord,
    #[serde(default)]
    messages: Vec<MessageRecord>,
}

impl TurnRecord {
    fn to_domain(self) -> ChatTurn {
        ChatTurn {
            session: self.session.to_domain(),
            messages: self
                .messages
                .into_iter()
                .map(MessageRecord::to_domain)
                .collect(),
        }
    }
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    // --- Auth ---
    async fn register(&self, credentials: &Credentials) -> PortResult<User> {
        let record: UserRecord = self
            .transport
            .post("/auth/register", &CredentialsBody::from_domain(credentials))
            .await?;
        Ok(record.to_domain())
    }

    async fn login(&self, credentials: &Credentials) -> PortResult<AccessToken> {
        let record: TokenRecord = self
            .transport
            .post("/auth/login", &CredentialsBody::from_domain(credentials))
            .await?;
        Ok(record.to_domain())
    }

    // --- Topics ---
    async fn list_topics(&self, query: &TopicQuery) -> PortResult<Vec<Topic>> {
        let records: Vec<TopicRecord> = self
            .transport
            .get_with_query("/topics", &query.to_pairs())
            .await?;
        Ok(records.into_iter().map(TopicRecord::to_domain).collect())
    }

    async fn today_topics(&self) -> PortResult<TodayTopics> {
        let record: TodayRecord = self.transport.get("/topics/today").await?;
        Ok(record.to_domain())
    }

    async fn get_topic(&self, topic_id: &TopicId) -> PortResult<Topic> {
        let record: TopicRecord = self
            .transport
            .get(&format!("/topics/{}", path_segment(topic_id.as_str())?))
            .await?;
        Ok(record.to_domain())
    }

    // --- Chat Sessions ---
    async fn list_sessions(&self) -> PortResult<Vec<ChatSession>> {
        let records: Vec<SessionRecord> = self.transport.get("/chat/sessions").await?;
        Ok(records.into_iter().map(SessionRecord::to_domain).collect())
    }

    async fn get_session(&self, session_id: &SessionId) -> PortResult<ChatSession> {
        let record: SessionRecord = self
            .transport
            .get(&format!("/chat/sessions/{}", path_segment(session_id.as_str())?))
            .await?;
        Ok(record.to_domain())
    }

    async fn create_session(
        &self,
        topic_id: Option<&TopicId>,
        title: Option<&str>,
    ) -> PortResult<ChatSession> {
        let body = CreateSessionBody {
            mode: SessionMode::for_topic(topic_id).as_str(),
            topic_id: topic_id.map(|id| WireId::from_client(id.as_str())),
            title,
        };
        let record: SessionRecord = self.transport.post("/chat/sessions", &body).await?;
        let session = record.to_domain();
        info!("Server issued chat session {}", session.id);
        Ok(session)
    }

    async fn archive_session(&self, session_id: &SessionId) -> PortResult<()> {
        self.transport
            .delete(&format!("/chat/sessions/{}", path_segment(session_id.as_str())?))
            .await
    }

    // --- Messages ---
    async fn list_messages(&self, session_id: &SessionId) -> PortResult<Vec<ChatMessage>> {
        let records: Vec<MessageRecord> = self
            .transport
            .get(&format!(
                "/chat/sessions/{}/messages",
                path_segment(session_id.as_str())?
            ))
            .await?;
        Ok(records.into_iter().map(MessageRecord::to_domain).collect())
    }

    async fn send_message(&self, session_id: &SessionId, content: &str) -> PortResult<ChatTurn> {
        let record: TurnRecord = self
            .transport
            .post(
                &format!(
                    "/chat/sessions/{}/messages",
                    path_segment(session_id.as_str())?
                ),
                &SendMessageBody { content },
            )
            .await?;
        Ok(record.to_domain())
    }
}
