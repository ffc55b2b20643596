//! services/client/src/app/chat.rs
//!
//! The chat state behind one chat screen: it owns the session id (created lazily
//! on the first send), the in-memory conversation and the send/error flags.

use research_dashboard_core::domain::{
    ChatEntry, ChatMessage, ChatSession, ChatTurn, DeliveryStatus, PendingMessage, SessionId,
    Topic, TopicId,
};
use research_dashboard_core::ports::{DashboardApi, PortError, PortResult};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

//=========================================================================================
// Snapshot
//=========================================================================================

/// A point-in-time copy of the chat state for rendering.
#[derive(Debug, Clone, Default)]
pub struct ChatSnapshot {
    pub session_id: Option<SessionId>,
    pub entries: Vec<ChatEntry>,
    pub is_sending: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct ChatInner {
    session_id: Option<SessionId>,
    entries: Vec<ChatEntry>,
    /// Number of sends currently awaiting the server.
    in_flight: usize,
    error: Option<String>,
}

//=========================================================================================
// ChatState
//=========================================================================================

pub struct ChatState {
    api: Arc<dyn DashboardApi>,
    topic_id: Option<TopicId>,
    /// Held across the create call so overlapping first sends share one session.
    session_gate: tokio::sync::Mutex<()>,
    // Never held across an await.
    inner: Mutex<ChatInner>,
}

impl ChatState {
    /// A fresh chat; `None` is the global chat across all topics.
    pub fn new(api: Arc<dyn DashboardApi>, topic_id: Option<TopicId>) -> Self {
        Self {
            api,
            topic_id,
            session_gate: tokio::sync::Mutex::new(()),
            inner: Mutex::new(ChatInner::default()),
        }
    }

    /// Reopens an existing session with its stored history.
    pub async fn resume(api: Arc<dyn DashboardApi>, session: &ChatSession) -> PortResult<Self> {
        let history = api.list_messages(&session.id).await.map_err(|e| {
            error!("Failed to load messages for session {}: {:?}", session.id, e);
            e
        })?;
        info!(
            "Resumed session {} with {} messages",
            session.id,
            history.len()
        );

        let state = Self::new(api, session.topic_id.clone());
        {
            let mut inner = state.lock();
            inner.session_id = Some(session.id.clone());
            inner.entries = history.into_iter().map(ChatEntry::Confirmed).collect();
        }
        Ok(state)
    }

    /// Looks a session up by id and resumes it. Archived and older sessions
    /// are found too, unlike a scan of the session list.
    pub async fn open(api: Arc<dyn DashboardApi>, session_id: &SessionId) -> PortResult<Self> {
        let session = api.get_session(session_id).await.map_err(|e| {
            error!("Failed to load chat session {}: {:?}", session_id, e);
            e
        })?;
        Self::resume(api, &session).await
    }

    /// Starts a new chat, scoped to `topic_id` only when that topic exists.
    ///
    /// Returns the loaded topic alongside the state; when the lookup fails the
    /// chat falls back to global mode.
    pub async fn start(
        api: Arc<dyn DashboardApi>,
        topic_id: Option<TopicId>,
    ) -> (Self, Option<Topic>) {
        let topic = match &topic_id {
            Some(id) => match api.get_topic(id).await {
                Ok(topic) => Some(topic),
                Err(e) => {
                    warn!("Could not load topic {}, using global chat: {:?}", id, e);
                    None
                }
            },
            None => None,
        };
        let scope = topic.as_ref().map(|t| t.id.clone());
        (Self::new(api, scope), topic)
    }

    fn lock(&self) -> MutexGuard<'_, ChatInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn topic_id(&self) -> Option<&TopicId> {
        self.topic_id.as_ref()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.lock().session_id.clone()
    }

    pub fn entries(&self) -> Vec<ChatEntry> {
        self.lock().entries.clone()
    }

    pub fn is_sending(&self) -> bool {
        self.lock().in_flight > 0
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let inner = self.lock();
        ChatSnapshot {
            session_id: inner.session_id.clone(),
            entries: inner.entries.clone(),
            is_sending: inner.in_flight > 0,
            error: inner.error.clone(),
        }
    }

    /// Returns the session id, creating the session on first use.
    pub async fn ensure_session(&self) -> PortResult<SessionId> {
        if let Some(id) = self.session_id() {
            return Ok(id);
        }

        let _gate = self.session_gate.lock().await;
        // Another send may have created it while we were waiting.
        if let Some(id) = self.session_id() {
            return Ok(id);
        }

        let session = self
            .api
            .create_session(self.topic_id.as_ref(), None)
            .await
            .map_err(|e| {
                error!("Failed to create chat session: {:?}", e);
                e
            })?;
        info!(
            "Created {} chat session {}",
            session.mode.as_str(),
            session.id
        );

        self.lock().session_id = Some(session.id.clone());
        Ok(session.id)
    }

    /// Sends one user message and appends the assistant's reply.
    ///
    /// Blank input is ignored. The user's message is shown immediately and is
    /// never removed, even when the request fails. Failures are recorded in
    /// [`ChatState::error`] rather than returned.
    pub async fn send_message(&self, content: &str) -> Option<ChatMessage> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return None;
        }

        let pending = PendingMessage::new(trimmed);
        let local_id = pending.local_id.clone();
        {
            let mut inner = self.lock();
            inner.error = None;
            inner.in_flight += 1;
            inner.entries.push(ChatEntry::Pending(pending));
        }
        debug!("Queued local message {}", local_id);

        let result = self.deliver(trimmed).await;

        let mut inner = self.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);
        match result {
            Ok(turn) => match turn.reply().cloned() {
                Some(reply) => {
                    match turn.user_echo().filter(|echo| echo.id != reply.id) {
                        Some(echo) => confirm(&mut inner.entries, &local_id, echo.clone()),
                        None => set_status(&mut inner.entries, &local_id, DeliveryStatus::Delivered),
                    }
                    inner.entries.push(ChatEntry::Confirmed(reply.clone()));
                    Some(reply)
                }
                None => {
                    warn!("Server returned no messages for {}", local_id);
                    set_status(&mut inner.entries, &local_id, DeliveryStatus::Failed);
                    inner.error = Some("Failed to send message".to_string());
                    None
                }
            },
            Err(e) => {
                error!("Failed to send message: {:?}", e);
                set_status(&mut inner.entries, &local_id, DeliveryStatus::Failed);
                inner.error = Some(send_error_message(&e));
                None
            }
        }
    }

    async fn deliver(&self, content: &str) -> PortResult<ChatTurn> {
        let session_id = self.ensure_session().await?;
        self.api.send_message(&session_id, content).await
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn confirm(entries: &mut [ChatEntry], local_id: &str, message: ChatMessage) {
    if let Some(entry) = entries
        .iter_mut()
        .find(|entry| entry.is_pending() && entry.id() == local_id)
    {
        *entry = ChatEntry::Confirmed(message);
    }
}

fn set_status(entries: &mut [ChatEntry], local_id: &str, status: DeliveryStatus) {
    for entry in entries.iter_mut() {
        if let ChatEntry::Pending(pending) = entry {
            if pending.local_id == local_id {
                pending.status = status;
            }
        }
    }
}

fn send_error_message(err: &PortError) -> String {
    match err.status() {
        Some(status) => format!("Failed to send message (status {})", status),
        None => "Failed to send message".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{message, FakeApi};
    use research_dashboard_core::domain::ChatRole;
    use std::sync::atomic::Ordering;

    fn chat(api: &Arc<FakeApi>, topic: Option<&str>) -> ChatState {
        ChatState::new(api.clone(), topic.map(TopicId::from))
    }

    #[tokio::test]
    async fn blank_input_is_a_no_op() {
        let api = Arc::new(FakeApi::default());
        let chat = chat(&api, None);

        for input in ["", "   ", "\n\t "] {
            assert!(chat.send_message(input).await.is_none());
        }

        let snapshot = chat.snapshot();
        assert!(snapshot.entries.is_empty());
        assert!(snapshot.session_id.is_none());
        assert!(snapshot.error.is_none());
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.send_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn user_message_is_shown_before_the_server_answers() {
        let api = Arc::new(FakeApi::gated());
        api.release_creates(1);
        let chat = Arc::new(chat(&api, None));

        let task = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send_message("  what is RAG?  ").await })
        };
        while api.send_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let snapshot = chat.snapshot();
        assert_eq!(snapshot.entries.len(), 1);
        assert!(snapshot.entries[0].is_pending());
        assert_eq!(snapshot.entries[0].content(), "what is RAG?");
        assert!(snapshot.is_sending);

        api.release_sends(1);
        let reply = task.await.unwrap().expect("reply");
        assert_eq!(reply.role, ChatRole::Assistant);
        assert!(!chat.is_sending());
    }

    #[tokio::test]
    async fn first_send_creates_exactly_one_session() {
        let api = Arc::new(FakeApi::default());
        let chat = chat(&api, None);

        chat.send_message("one").await;
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 1);
        chat.send_message("two").await;
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(chat.session_id(), Some(SessionId::from("42")));
        assert_eq!(chat.entries().len(), 4);
    }

    #[tokio::test]
    async fn resumed_session_never_creates() {
        let api = Arc::new(FakeApi::default());
        api.set_history(vec![
            message("1", ChatRole::User, "earlier"),
            message("2", ChatRole::Assistant, "answer"),
        ]);
        let session = crate::app::testing::session("7", None);
        let chat = ChatState::resume(api.clone(), &session).await.unwrap();
        assert_eq!(chat.entries().len(), 2);

        chat.send_message("follow-up").await;
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.sent_to(), vec![SessionId::from("7")]);
    }

    #[tokio::test]
    async fn archived_session_opens_by_id() {
        let api = Arc::new(FakeApi::default());
        let mut archived = crate::app::testing::session("9", Some("3"));
        archived.is_archived = true;
        api.set_archived(vec![archived]);
        api.set_history(vec![message("1", ChatRole::User, "old question")]);

        let chat = ChatState::open(api.clone(), &SessionId::from("9")).await.unwrap();
        assert_eq!(chat.session_id(), Some(SessionId::from("9")));
        assert_eq!(chat.topic_id(), Some(&TopicId::from("3")));
        assert_eq!(chat.entries().len(), 1);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);

        let missing = ChatState::open(api.clone(), &SessionId::from("10")).await;
        assert!(matches!(missing, Err(PortError::Api { status: 404, .. })));
    }

    #[tokio::test]
    async fn unknown_topic_starts_a_global_chat() {
        let api = Arc::new(FakeApi::default());
        let (chat, topic) = ChatState::start(api.clone(), Some(TopicId::from("77"))).await;
        assert!(topic.is_none());
        assert!(chat.topic_id().is_none());

        chat.send_message("hello").await;
        assert_eq!(api.created_for(), vec![None]);
    }

    #[tokio::test]
    async fn known_topic_starts_a_topic_chat() {
        let api = Arc::new(FakeApi::default());
        api.set_topics(vec![crate::app::testing::topic("3", "Agents")]);
        let (chat, topic) = ChatState::start(api.clone(), Some(TopicId::from("3"))).await;
        assert_eq!(topic.map(|t| t.title), Some("Agents".to_string()));

        chat.send_message("hello").await;
        assert_eq!(api.created_for(), vec![Some(TopicId::from("3"))]);
    }

    #[tokio::test]
    async fn overlapping_first_sends_share_one_session() {
        let api = Arc::new(FakeApi::gated());
        api.release_sends(2);
        let chat = Arc::new(chat(&api, Some("3")));

        let first = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send_message("a").await })
        };
        let second = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send_message("b").await })
        };
        while chat.entries().len() < 2 {
            tokio::task::yield_now().await;
        }

        api.release_creates(1);
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(api.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.created_for(), vec![Some(TopicId::from("3"))]);
        assert_eq!(chat.entries().len(), 4);
    }

    #[tokio::test]
    async fn assistant_role_is_picked_from_the_turn() {
        let api = Arc::new(FakeApi::default());
        api.set_reply(vec![
            message("10", ChatRole::User, "hi"),
            message("11", ChatRole::Assistant, "X"),
        ]);
        let chat = chat(&api, None);

        let reply = chat.send_message("hi").await.unwrap();
        assert_eq!(reply.content, "X");

        let entries = chat.entries();
        assert_eq!(entries.len(), 2);
        // The optimistic entry was reconciled in place with the server's copy.
        assert_eq!(entries[0].id(), "10");
        assert!(!entries[0].is_pending());
        assert_eq!(entries[1].content(), "X");
    }

    #[tokio::test]
    async fn last_message_is_used_without_an_assistant_role() {
        let api = Arc::new(FakeApi::default());
        api.set_reply(vec![
            message("10", ChatRole::User, "hi"),
            message("12", ChatRole::User, "fallback"),
        ]);
        let chat = chat(&api, None);

        let reply = chat.send_message("hi").await.unwrap();
        assert_eq!(reply.id.as_str(), "12");
        let entries = chat.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].content(), "fallback");
    }

    #[tokio::test]
    async fn lone_echo_is_appended_once() {
        let api = Arc::new(FakeApi::default());
        api.set_reply(vec![message("10", ChatRole::User, "hi")]);
        let chat = chat(&api, None);

        chat.send_message("hi").await;
        let entries = chat.entries();
        assert_eq!(entries.len(), 2);
        match &entries[0] {
            ChatEntry::Pending(p) => assert_eq!(p.status, DeliveryStatus::Delivered),
            other => panic!("expected pending entry, got {other:?}"),
        }
        assert_eq!(entries[1].id(), "10");
        assert!(chat.error().is_none());
    }

    #[tokio::test]
    async fn server_error_keeps_the_user_message() {
        let api = Arc::new(FakeApi::default());
        api.fail_send(500);
        let chat = chat(&api, None);

        assert!(chat.send_message("hello").await.is_none());

        let snapshot = chat.snapshot();
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].content(), "hello");
        match &snapshot.entries[0] {
            ChatEntry::Pending(p) => assert_eq!(p.status, DeliveryStatus::Failed),
            other => panic!("expected pending entry, got {other:?}"),
        }
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Failed to send message (status 500)")
        );
        assert!(!snapshot.is_sending);

        // A second failure only grows the list.
        chat.send_message("again").await;
        assert_eq!(chat.entries().len(), 2);
    }

    #[tokio::test]
    async fn failed_session_create_surfaces_generic_error() {
        let api = Arc::new(FakeApi::default());
        api.fail_create_network();
        let chat = chat(&api, None);

        chat.send_message("hello").await;
        assert_eq!(chat.error().as_deref(), Some("Failed to send message"));
        assert!(chat.session_id().is_none());
        assert_eq!(api.send_calls.load(Ordering::SeqCst), 0);
        assert_eq!(chat.entries().len(), 1);
    }

    #[tokio::test]
    async fn new_send_clears_the_previous_error() {
        let api = Arc::new(FakeApi::default());
        api.fail_send(503);
        let chat = chat(&api, None);
        chat.send_message("first").await;
        assert!(chat.error().is_some());

        api.succeed_send();
        chat.send_message("second").await;
        assert!(chat.error().is_none());
        assert_eq!(chat.entries().len(), 3);
    }
}
