//! services/client/src/adapters/transport.rs
//!
//! Generic JSON request helpers against the configured API base URL. Every
//! request carries the bearer token from the auth context when one is stored,
//! and every non-2xx response is turned into `PortError::Api`.

use bytes::Bytes;
use reqwest::{header, Client, Method, RequestBuilder};
use research_dashboard_core::ports::{PortError, PortResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use crate::app::auth::AuthContext;
use crate::config::Config;

/// Longest body excerpt written to the log on failures.
const LOG_BODY_LIMIT: usize = 300;

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    auth: AuthContext,
}

impl HttpTransport {
    pub fn new(config: &Config, auth: AuthContext) -> PortResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PortError::Unexpected(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, &config.api_base_url, auth))
    }

    pub fn with_client(client: Client, base_url: &str, auth: AuthContext) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> PortResult<T> {
        self.get_with_query(path, &[]).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> PortResult<T> {
        let mut request = self.request(Method::GET, path);
        if !query.is_empty() {
            request = request.query(query);
        }
        let body = self.execute(request, "GET", path).await?;
        decode(&body, path)
    }

    pub async fn post<B, T>(&self, path: &str, payload: &B) -> PortResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(payload);
        let body = self.execute(request, "POST", path).await?;
        decode(&body, path)
    }

    /// Issues a DELETE and ignores whatever body comes back.
    pub async fn delete(&self, path: &str) -> PortResult<()> {
        let request = self.request(Method::DELETE, path);
        self.execute(request, "DELETE", path).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = self.auth.token() {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn execute(&self, request: RequestBuilder, verb: &str, path: &str) -> PortResult<Bytes> {
        debug!("{} {}", verb, path);
        let response = request.send().await.map_err(|e| {
            error!("{} {} failed before a response: {}", verb, path, e);
            PortError::Network(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;
        debug!("{} {} -> {} ({} bytes)", verb, path, status, body.len());

        if !status.is_success() {
            let raw = String::from_utf8_lossy(&body).to_string();
            error!(
                "{} {} failed: status={} body_excerpt={}",
                verb,
                path,
                status,
                excerpt(&raw)
            );
            return Err(PortError::Api {
                status: status.as_u16(),
                detail: error_detail(&body),
                body: if raw.is_empty() { None } else { Some(raw) },
            });
        }

        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(body: &[u8], path: &str) -> PortResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        error!(
            "Failed to decode response from {}: {}. body_excerpt={}",
            path,
            e,
            excerpt(&String::from_utf8_lossy(body))
        );
        PortError::Decode(e.to_string())
    })
}

/// Pulls the human-readable `detail` out of an error body.
///
/// Validation errors carry a list instead of a string; those are kept as JSON.
pub fn error_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(detail) => Some(detail.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Checks that an id can be used as a single URL path segment.
///
/// Ids come from the command line, so anything that could climb or split the
/// path is refused before a request is built.
pub fn path_segment(id: &str) -> PortResult<&str> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(id)
    } else {
        error!("Refusing to build a request path from id {:?}", id);
        Err(PortError::NotFound(format!("invalid id {:?}", id)))
    }
}

fn excerpt(raw: &str) -> String {
    if raw.chars().count() <= LOG_BODY_LIMIT {
        raw.to_string()
    } else {
        let cut: String = raw.chars().take(LOG_BODY_LIMIT).collect();
        format!("{}...", cut)
    }
}
