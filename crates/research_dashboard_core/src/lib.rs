pub mod domain;
pub mod ports;

pub use domain::{
    AccessToken, AuthState, ChatEntry, ChatMessage, ChatRole, ChatSession, ChatTurn,
    Credentials, DeliveryStatus, MessageId, PendingMessage, SessionId, SessionMode,
    TodayTopics, Topic, TopicId, TopicQuery, TopicScores, TopicSort, User,
};
pub use ports::{AuthStore, DashboardApi, PortError, PortResult};
