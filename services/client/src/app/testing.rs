//! In-memory `DashboardApi` used by the unit tests.

use async_trait::async_trait;
use chrono::Utc;
use research_dashboard_core::domain::{
    AccessToken, ChatMessage, ChatRole, ChatSession, ChatTurn, Credentials, MessageId,
    SessionId, SessionMode, TodayTopics, Topic, TopicId, TopicQuery, TopicScores, User,
};
use research_dashboard_core::ports::{DashboardApi, PortError, PortResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;

pub fn message(id: &str, role: ChatRole, content: &str) -> ChatMessage {
    ChatMessage {
        id: MessageId::from(id),
        session_id: None,
        role,
        content: content.to_string(),
        created_at: Utc::now(),
    }
}

pub fn session(id: &str, topic: Option<&str>) -> ChatSession {
    let now = Utc::now();
    let topic_id = topic.map(TopicId::from);
    ChatSession {
        id: SessionId::from(id),
        mode: SessionMode::for_topic(topic_id.as_ref()),
        title: None,
        topic_id,
        is_archived: false,
        created_at: now,
        updated_at: now,
    }
}

pub fn topic(id: &str, title: &str) -> Topic {
    Topic {
        id: TopicId::from(id),
        title: title.to_string(),
        summary: format!("Summary of {}", title),
        source: "arXiv".to_string(),
        source_url: None,
        date: None,
        scores: TopicScores {
            trendiness: 9.32,
            technical_depth: 8.2,
            practicality: 8.6,
        },
        tags: vec!["RAG".to_string(), "LLMs".to_string()],
    }
}

fn api_error(status: u16, detail: Option<&str>) -> PortError {
    PortError::Api {
        status,
        body: detail.map(|d| format!("{{\"detail\":\"{}\"}}", d)),
        detail: detail.map(str::to_string),
    }
}

#[derive(Default)]
struct Script {
    login_error: Option<(u16, String)>,
    create_network_error: bool,
    send_error: Option<u16>,
    reply: Option<Vec<ChatMessage>>,
    history: Vec<ChatMessage>,
    topics: Vec<Topic>,
    today: TodayTopics,
    sessions: Vec<ChatSession>,
    /// Reachable by id but left out of `list_sessions`.
    archived: Vec<ChatSession>,
    list_error: Option<u16>,
    created_for: Vec<Option<TopicId>>,
    sent_to: Vec<SessionId>,
}

pub struct FakeApi {
    pub create_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    create_gate: Semaphore,
    send_gate: Semaphore,
    list_gate: Semaphore,
    next_id: AtomicUsize,
    script: Mutex<Script>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self::with_permits(Semaphore::MAX_PERMITS)
    }
}

impl FakeApi {
    /// Every call that can be held blocks until released.
    pub fn gated() -> Self {
        Self::with_permits(0)
    }

    fn with_permits(permits: usize) -> Self {
        Self {
            create_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            create_gate: Semaphore::new(permits),
            send_gate: Semaphore::new(permits),
            list_gate: Semaphore::new(permits),
            next_id: AtomicUsize::new(100),
            script: Mutex::new(Script::default()),
        }
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn release_creates(&self, n: usize) {
        self.create_gate.add_permits(n);
    }

    pub fn release_sends(&self, n: usize) {
        self.send_gate.add_permits(n);
    }

    pub fn release_lists(&self, n: usize) {
        self.list_gate.add_permits(n);
    }

    pub fn fail_login(&self, status: u16, detail: &str) {
        self.script().login_error = Some((status, detail.to_string()));
    }

    pub fn fail_create_network(&self) {
        self.script().create_network_error = true;
    }

    pub fn fail_send(&self, status: u16) {
        self.script().send_error = Some(status);
    }

    pub fn succeed_send(&self) {
        self.script().send_error = None;
    }

    pub fn fail_lists(&self, status: u16) {
        self.script().list_error = Some(status);
    }

    pub fn set_reply(&self, messages: Vec<ChatMessage>) {
        self.script().reply = Some(messages);
    }

    pub fn set_history(&self, messages: Vec<ChatMessage>) {
        self.script().history = messages;
    }

    pub fn set_topics(&self, topics: Vec<Topic>) {
        self.script().topics = topics;
    }

    pub fn set_today(&self, today: TodayTopics) {
        self.script().today = today;
    }

    pub fn set_sessions(&self, sessions: Vec<ChatSession>) {
        self.script().sessions = sessions;
    }

    pub fn set_archived(&self, sessions: Vec<ChatSession>) {
        self.script().archived = sessions;
    }

    pub fn created_for(&self) -> Vec<Option<TopicId>> {
        self.script().created_for.clone()
    }

    pub fn sent_to(&self) -> Vec<SessionId> {
        self.script().sent_to.clone()
    }

    fn next_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }

    async fn hold_list(&self) -> PortResult<()> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self.list_gate.acquire().await;
        match self.script().list_error {
            Some(status) => Err(api_error(status, None)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn register(&self, credentials: &Credentials) -> PortResult<User> {
        Ok(User {
            id: self.next_id(),
            email: credentials.email.clone(),
            is_active: true,
        })
    }

    async fn login(&self, _credentials: &Credentials) -> PortResult<AccessToken> {
        if let Some((status, detail)) = self.script().login_error.clone() {
            return Err(api_error(status, Some(&detail)));
        }
        Ok(AccessToken {
            token: "test-token".to_string(),
            token_type: "bearer".to_string(),
        })
    }

    async fn list_topics(&self, _query: &TopicQuery) -> PortResult<Vec<Topic>> {
        self.hold_list().await?;
        Ok(self.script().topics.clone())
    }

    async fn today_topics(&self) -> PortResult<TodayTopics> {
        self.hold_list().await?;
        Ok(self.script().today.clone())
    }

    async fn get_topic(&self, topic_id: &TopicId) -> PortResult<Topic> {
        self.script()
            .topics
            .iter()
            .find(|t| &t.id == topic_id)
            .cloned()
            .ok_or_else(|| api_error(404, Some("Topic not found")))
    }

    async fn list_sessions(&self) -> PortResult<Vec<ChatSession>> {
        self.hold_list().await?;
        Ok(self.script().sessions.clone())
    }

    async fn get_session(&self, session_id: &SessionId) -> PortResult<ChatSession> {
        let script = self.script();
        let found = script
            .sessions
            .iter()
            .chain(script.archived.iter())
            .find(|s| &s.id == session_id)
            .cloned();
        found.ok_or_else(|| api_error(404, Some("Chat session not found")))
    }

    async fn create_session(
        &self,
        topic_id: Option<&TopicId>,
        _title: Option<&str>,
    ) -> PortResult<ChatSession> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self.create_gate.acquire().await;
        let mut script = self.script();
        if script.create_network_error {
            return Err(PortError::Network("connection refused".to_string()));
        }
        script.created_for.push(topic_id.cloned());
        Ok(session("42", topic_id.map(TopicId::as_str)))
    }

    async fn archive_session(&self, session_id: &SessionId) -> PortResult<()> {
        let mut script = self.script();
        if let Some(pos) = script.sessions.iter().position(|s| &s.id == session_id) {
            let mut session = script.sessions.remove(pos);
            session.is_archived = true;
            script.archived.push(session);
        }
        Ok(())
    }

    async fn list_messages(&self, _session_id: &SessionId) -> PortResult<Vec<ChatMessage>> {
        Ok(self.script().history.clone())
    }

    async fn send_message(&self, session_id: &SessionId, content: &str) -> PortResult<ChatTurn> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self.send_gate.acquire().await;
        let (error, reply) = {
            let mut script = self.script();
            script.sent_to.push(session_id.clone());
            (script.send_error, script.reply.clone())
        };
        if let Some(status) = error {
            return Err(api_error(status, Some("LLM backend unavailable")));
        }
        let messages = match reply {
            Some(messages) => messages,
            None => vec![
                message(&self.next_id(), ChatRole::User, content),
                message(&self.next_id(), ChatRole::Assistant, &format!("echo: {}", content)),
            ],
        };
        Ok(ChatTurn {
            session: session(session_id.as_str(), None),
            messages,
        })
    }
}
