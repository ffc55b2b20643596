//! services/client/src/app/state.rs
//!
//! Defines the application state shared by every command.

use crate::adapters::{FileAuthStore, HttpDashboardApi, HttpTransport};
use crate::app::auth::AuthContext;
use crate::config::Config;
use crate::error::ClientError;
use research_dashboard_core::ports::DashboardApi;
use std::sync::Arc;
use tracing::info;

/// The shared application state, created once at startup and passed to all commands.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn DashboardApi>,
    pub auth: AuthContext,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the file-backed auth store and the HTTP adapter from configuration.
    pub fn from_config(config: Arc<Config>) -> Result<Self, ClientError> {
        let store = Arc::new(FileAuthStore::new(config.auth_path.clone()));
        info!("Loading auth state from {}", store.path().display());
        let auth = AuthContext::load(store)?;
        info!("Signed in: {}", auth.is_authenticated());

        let transport = HttpTransport::new(&config, auth.clone())?;
        let api: Arc<dyn DashboardApi> = Arc::new(HttpDashboardApi::new(transport));

        Ok(Self { api, auth, config })
    }
}
