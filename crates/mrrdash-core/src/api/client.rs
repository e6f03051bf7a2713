//! HTTP client for the dashboard's login and signup endpoints.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::AuthError;
use crate::config::Config;

// ============================================================================
// Constants
// ============================================================================

/// Path prefix shared by all dashboard API endpoints
const API_PREFIX: &str = "/api/v1";

/// HTTP request timeout in seconds.
/// Keeps a hung login from waiting forever.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

impl AuthMode {
    fn endpoint(self) -> &'static str {
        match self {
            AuthMode::Login => "login",
            AuthMode::Signup => "signup",
        }
    }

    /// Shown when the service rejects the request without a message
    fn fallback_message(self) -> &'static str {
        match self {
            AuthMode::Login => "Failed to login. Check your credentials",
            AuthMode::Signup => "Failed to signup. Check your signup data",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    #[serde(skip)]
    pub mode: AuthMode,
}

impl Credentials {
    pub fn login(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            mode: AuthMode::Login,
        }
    }

    pub fn signup(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            mode: AuthMode::Signup,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("mode", &self.mode)
            .finish()
    }
}

/// What a successful login or signup hands back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub token: String,
    pub user_id: String,
    /// Absolute expiry, epoch seconds
    pub expires_at: i64,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthGrant, AuthError>;
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(rename = "idToken", alias = "id_token")]
    id_token: String,
    #[serde(rename = "localId", alias = "local_id")]
    local_id: String,
    #[serde(rename = "expiresAt", alias = "expires_at")]
    expires_at: ExpiresAt,
}

/// The backend has sent expiry both as a number and as a numeric string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpiresAt {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ExpiresAt {
    fn to_epoch_secs(&self) -> Option<i64> {
        match self {
            ExpiresAt::Integer(secs) => Some(*secs),
            ExpiresAt::Float(secs) if secs.is_finite() => Some(secs.trunc() as i64),
            ExpiresAt::Float(_) => None,
            ExpiresAt::Text(text) => {
                let text = text.trim();
                text.parse::<i64>().ok().or_else(|| {
                    text.parse::<f64>()
                        .ok()
                        .filter(|secs| secs.is_finite())
                        .map(|secs| secs.trunc() as i64)
                })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

/// API client for the dashboard's auth endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
}

impl AuthClient {
    /// Create a new client for `base_url` (scheme and host, no trailing path)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_url(&self, mode: AuthMode) -> String {
        format!("{}{}/{}", self.base_url, API_PREFIX, mode.endpoint())
    }

    fn rejection(mode: AuthMode, status: reqwest::StatusCode, body: &str) -> AuthError {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|e| e.message)
            .filter(|m| !m.trim().is_empty());

        match message {
            Some(message) => AuthError::Rejected(message),
            None => {
                let body = AuthError::truncate_body(body);
                debug!(%status, %body, "Rejection without message");
                AuthError::Rejected(mode.fallback_message().to_string())
            }
        }
    }

    fn parse_grant(body: &str) -> Result<AuthGrant, AuthError> {
        let auth: AuthResponse = serde_json::from_str(body).map_err(|e| {
            AuthError::InvalidResponse(format!(
                "{}: {}",
                e,
                AuthError::truncate_body(body)
            ))
        })?;

        let expires_at = auth.expires_at.to_epoch_secs().ok_or_else(|| {
            AuthError::InvalidResponse(format!("unparsable expiresAt {:?}", auth.expires_at))
        })?;

        Ok(AuthGrant {
            token: auth.id_token,
            user_id: auth.local_id,
            expires_at,
        })
    }
}

#[async_trait]
impl AuthService for AuthClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthGrant, AuthError> {
        let url = self.endpoint_url(credentials.mode);
        debug!(url = %url, email = %credentials.email, "Sending auth request");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(credentials)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = Self::rejection(credentials.mode, status, &body);
            warn!(%status, mode = %credentials.mode, error = %err, "Authentication rejected");
            return Err(err);
        }

        Self::parse_grant(&body)
    }
}
