//! HTTP transport to the console backend proxy.
//!
//! The backend performs the actual `sts:AssumeRole` and describe/list calls;
//! this client only speaks its JSON contract. All paths are absolute and are
//! resolved against the console origin. No client-side timeout is set: the
//! backend's own timeout is the only bound on a request.

use super::transport_errors::{categorize_reqwest_error, categorize_status, TransportError};
use crate::app::errors::{ConsoleError, ConsoleResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

/// Header carrying the opaque session id on every authenticated request
pub const SESSION_HEADER: &str = "x-session-id";

const ASSUME_ROLE_PATH: &str = "/api/backend-home/";

#[derive(Debug, Serialize)]
struct AssumeRoleRequest<'a> {
    role_arn: &'a str,
    region: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssumeRoleResponse {
    pub session_id: String,
    #[serde(default)]
    pub expiration: Option<String>,
}

impl AssumeRoleResponse {
    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.expiration
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Body of a service `/health` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a client for the console served at `base_url`
    pub fn new(base_url: &str) -> ConsoleResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ConsoleError::InvalidInput(format!("invalid backend URL '{}': {}", base_url, e))
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConsoleError::InvalidInput(format!(
                "backend URL must be http or https, got '{}'",
                base_url.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConsoleError::InvalidInput(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an absolute API path against the console origin
    pub fn endpoint(&self, path: &str) -> ConsoleResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ConsoleError::InvalidInput(format!("invalid API path '{}': {}", path, e)))
    }

    /// Exchange a role ARN for an opaque session id. Unauthenticated.
    ///
    /// Any failure, whether the backend rejected the role or never answered,
    /// is reported as [`ConsoleError::AuthenticationFailed`].
    pub async fn assume_role(
        &self,
        role_arn: &str,
        region: &str,
    ) -> ConsoleResult<AssumeRoleResponse> {
        let url = self.endpoint(ASSUME_ROLE_PATH)?;
        debug!("Requesting role assumption at {}", url);

        let auth_failed = |e: TransportError| ConsoleError::AuthenticationFailed {
            message: e.message(),
        };

        let response = self
            .client
            .post(url)
            .json(&AssumeRoleRequest { role_arn, region })
            .send()
            .await
            .map_err(|e| auth_failed(categorize_reqwest_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Role assumption rejected with HTTP {}", status.as_u16());
            return Err(auth_failed(categorize_status(status, &body)));
        }

        response
            .json::<AssumeRoleResponse>()
            .await
            .map_err(|e| auth_failed(categorize_reqwest_error(&e)))
    }

    /// GET a JSON document, optionally attaching a session id and a region
    /// query parameter
    pub async fn get_json(
        &self,
        path: &str,
        region: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<serde_json::Value, TransportError> {
        let url = self.endpoint(path).map_err(|e| TransportError::Status {
            status: 0,
            message: e.to_string(),
        })?;

        let mut request = self.client.get(url);
        if let Some(region) = region {
            request = request.query(&[("region", region)]);
        }
        if let Some(session_id) = session_id {
            request = request.header(SESSION_HEADER, session_id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| categorize_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(categorize_status(status, &body));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| categorize_reqwest_error(&e))
    }
}
