//! services/client/src/adapters/auth_store.rs
//!
//! Implementations of the `AuthStore` port: a JSON file on disk that plays the
//! role of browser local storage, and an in-memory store for tests and
//! one-shot runs.

use research_dashboard_core::domain::AuthState;
use research_dashboard_core::ports::{AuthStore, PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

//=========================================================================================
// On-disk Record
//=========================================================================================

#[derive(Serialize, Deserialize, Default)]
struct StoredAuth {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default, rename = "isAuthenticated", alias = "is_authenticated")]
    is_authenticated: bool,
}

impl StoredAuth {
    fn to_domain(self) -> AuthState {
        AuthState {
            access_token: self.access_token,
            is_authenticated: self.is_authenticated,
        }
    }

    fn from_domain(state: &AuthState) -> Self {
        Self {
            access_token: state.access_token.clone(),
            is_authenticated: state.is_authenticated,
        }
    }
}

//=========================================================================================
// File Store
//=========================================================================================

/// Persists the auth state as a small JSON document.
#[derive(Clone, Debug)]
pub struct FileAuthStore {
    path: PathBuf,
}

impl FileAuthStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuthStore for FileAuthStore {
    fn load(&self) -> PortResult<AuthState> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No auth state at {}", self.path.display());
                return Ok(AuthState::default());
            }
            Err(e) => return Err(PortError::Storage(e.to_string())),
        };
        let stored: StoredAuth =
            serde_json::from_slice(&raw).map_err(|e| PortError::Storage(e.to_string()))?;
        Ok(stored.to_domain())
    }

    fn save(&self, state: &AuthState) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| PortError::Storage(e.to_string()))?;
            }
        }
        let json = serde_json::to_vec_pretty(&StoredAuth::from_domain(state))
            .map_err(|e| PortError::Storage(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| PortError::Storage(e.to_string()))
    }

    fn clear(&self) -> PortResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Storage(e.to_string())),
        }
    }
}

//=========================================================================================
// In-memory Store
//=========================================================================================

#[derive(Default)]
pub struct MemoryAuthStore {
    state: Mutex<AuthState>,
}

impl MemoryAuthStore {
    pub fn new(state: AuthState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl AuthStore for MemoryAuthStore {
    fn load(&self) -> PortResult<AuthState> {
        let state = self
            .state
            .lock()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        Ok(state.clone())
    }

    fn save(&self, state: &AuthState) -> PortResult<()> {
        let mut stored = self
            .state
            .lock()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        *stored = state.clone();
        Ok(())
    }

    fn clear(&self) -> PortResult<()> {
        self.save(&AuthState::default())
    }
}
