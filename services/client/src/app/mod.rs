pub mod auth;
pub mod chat;
pub mod feeds;
pub mod state;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the pieces the binary wires together.
pub use auth::{require_auth, AuthContext};
pub use chat::{ChatSnapshot, ChatState};
pub use feeds::{sessions_feed, today_feed, topics_feed, Feed, FeedState};
pub use state::AppState;
