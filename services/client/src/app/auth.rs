//! services/client/src/app/auth.rs
//!
//! The authentication context shared by the transport and the commands, plus the
//! login/logout flows and the guard protecting everything behind the login screen.

use research_dashboard_core::domain::{AuthState, Credentials, User};
use research_dashboard_core::ports::{AuthStore, DashboardApi, PortError, PortResult};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use tracing::{error, info};

use crate::adapters::MemoryAuthStore;

//=========================================================================================
// AuthContext
//=========================================================================================

/// Explicit session context created once at the root and passed down.
///
/// Reads are served from memory; every change is written through to the store.
#[derive(Clone)]
pub struct AuthContext {
    store: Arc<dyn AuthStore>,
    state: Arc<RwLock<AuthState>>,
}

impl AuthContext {
    /// Creates a context primed with whatever the store currently holds.
    pub fn load(store: Arc<dyn AuthStore>) -> PortResult<Self> {
        let state = store.load()?;
        Ok(Self {
            store,
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// A signed-out context that persists nothing.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryAuthStore::default()),
            state: Arc::new(RwLock::new(AuthState::default())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, AuthState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    /// Stores a freshly issued token and raises the authenticated flag.
    pub fn sign_in(&self, token: impl Into<String>) -> PortResult<()> {
        let next = AuthState {
            access_token: Some(token.into()),
            is_authenticated: true,
        };
        self.replace(next)
    }

    pub fn sign_out(&self) -> PortResult<()> {
        self.store.clear()?;
        let mut state = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *state = AuthState::default();
        Ok(())
    }

    fn replace(&self, next: AuthState) -> PortResult<()> {
        self.store.save(&next)?;
        let mut state = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *state = next;
        Ok(())
    }
}

//=========================================================================================
// Guard
//=========================================================================================

/// Lets a caller through only when the authenticated flag is set.
///
/// Only the flag is checked; token validity is the server's business.
pub fn require_auth(auth: &AuthContext) -> PortResult<()> {
    if auth.is_authenticated() {
        Ok(())
    } else {
        Err(PortError::Unauthorized)
    }
}

//=========================================================================================
// Flows
//=========================================================================================

/// POST /auth/login, then persist the token.
pub async fn login(
    api: &dyn DashboardApi,
    auth: &AuthContext,
    credentials: &Credentials,
) -> PortResult<()> {
    let token = api.login(credentials).await.map_err(|e| {
        error!("Login failed: {:?}", e);
        e
    })?;
    auth.sign_in(token.token)?;
    info!("Signed in as {}", credentials.email);
    Ok(())
}

/// Forgets the stored token. The server keeps no session to invalidate.
pub fn logout(auth: &AuthContext) -> PortResult<()> {
    auth.sign_out()?;
    info!("Signed out");
    Ok(())
}

/// POST /auth/register. Registration does not sign the user in.
pub async fn register(api: &dyn DashboardApi, credentials: &Credentials) -> PortResult<User> {
    api.register(credentials).await.map_err(|e| {
        error!("Registration failed: {:?}", e);
        e
    })
}

/// The message shown under the login form.
pub fn login_error_message(err: &PortError) -> String {
    match err {
        PortError::Api {
            detail: Some(detail),
            ..
        } => detail.clone(),
        PortError::Api { status, .. } => format!("Login failed (status {})", status),
        _ => "Login failed".to_string(),
    }
}
