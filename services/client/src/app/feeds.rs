//! services/client/src/app/feeds.rs
//!
//! Read-only fetchers behind the dashboard, topics and history views. Each one
//! issues a single request when mounted and exposes the result together with
//! loading and error flags.

use research_dashboard_core::domain::{ChatSession, TodayTopics, Topic, TopicQuery};
use research_dashboard_core::ports::{DashboardApi, PortError, PortResult};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// What a view renders from a feed.
#[derive(Debug, Clone, Default)]
pub struct FeedState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
}

/// A mounted fetcher.
///
/// Unmounting (or dropping) the feed does not abort the request; it only stops
/// the settled response from being written.
pub struct Feed<T> {
    state: Arc<Mutex<FeedState<T>>>,
    unmounted: CancellationToken,
    task: Option<JoinHandle<()>>,
}

fn lock<T>(state: &Mutex<FeedState<T>>) -> MutexGuard<'_, FeedState<T>> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T> Feed<T>
where
    T: Clone + Default + Send + 'static,
{
    /// Starts the request on the current Tokio runtime.
    pub fn mount<Fut>(label: &'static str, request: Fut, describe: fn(&PortError) -> String) -> Self
    where
        Fut: Future<Output = PortResult<T>> + Send + 'static,
    {
        let state = Arc::new(Mutex::new(FeedState {
            data: T::default(),
            loading: true,
            error: None,
        }));
        let unmounted = CancellationToken::new();

        let task = {
            let state = state.clone();
            let unmounted = unmounted.clone();
            tokio::spawn(async move {
                let result = request.await;
                if let Err(e) = &result {
                    error!("Failed to load {}: {:?}", label, e);
                }
                if unmounted.is_cancelled() {
                    debug!("Dropping {} response after unmount", label);
                    return;
                }
                let mut state = lock(&state);
                match result {
                    Ok(data) => state.data = data,
                    Err(e) => state.error = Some(describe(&e)),
                }
                state.loading = false;
            })
        };

        Self {
            state,
            unmounted,
            task: Some(task),
        }
    }

    pub fn snapshot(&self) -> FeedState<T> {
        lock(&self.state).clone()
    }

    pub fn unmount(&self) {
        self.unmounted.cancel();
    }

    /// Waits for the request to settle and returns the resulting state.
    pub async fn settled(&mut self) -> FeedState<T> {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Feed task failed: {}", e);
            }
        }
        self.snapshot()
    }
}

impl<T> Drop for Feed<T> {
    fn drop(&mut self) {
        self.unmounted.cancel();
    }
}

//=========================================================================================
// Concrete Feeds
//=========================================================================================

/// GET /topics
pub fn topics_feed(api: Arc<dyn DashboardApi>, query: TopicQuery) -> Feed<Vec<Topic>> {
    Feed::mount(
        "topics",
        async move { api.list_topics(&query).await },
        |e| match e.status() {
            Some(status) => format!("Failed to load topics (status {})", status),
            None => "Failed to load topics".to_string(),
        },
    )
}

/// GET /topics/today
pub fn today_feed(api: Arc<dyn DashboardApi>) -> Feed<TodayTopics> {
    Feed::mount(
        "today topics",
        async move { api.today_topics().await },
        |e| match e.status() {
            Some(status) => format!("Failed to load today topics (status {})", status),
            None => "Failed to load today topics".to_string(),
        },
    )
}

/// GET /chat/sessions
pub fn sessions_feed(api: Arc<dyn DashboardApi>) -> Feed<Vec<ChatSession>> {
    Feed::mount(
        "chat sessions",
        async move { api.list_sessions().await },
        |_| "Failed to load chats.".to_string(),
    )
}
