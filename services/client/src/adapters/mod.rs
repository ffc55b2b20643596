pub mod api;
pub mod auth_store;
pub mod transport;

pub use api::HttpDashboardApi;
pub use auth_store::{FileAuthStore, MemoryAuthStore};
pub use transport::HttpTransport;
