use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::BookingError;

pub const CALENDAR_SCOPES: &str =
    "https://www.googleapis.com/auth/calendar.events https://www.googleapis.com/auth/calendar.readonly";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// Supplies bearer tokens for calendar requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, BookingError>;
}

/// Fixed token, for callers that already hold one.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, BookingError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct ServiceAccountFile {
    client_email: String,
    private_key: String,
    token_uri: Option<String>,
}

pub struct ServiceAccountKey {
    pub client_email: String,
    pub token_uri: String,
    signing_key: EncodingKey,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, BookingError> {
        let content = fs::read_to_string(path).map_err(|e| {
            BookingError::ServiceUnavailable(format!(
                "cannot read service account key {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, BookingError> {
        let parsed: ServiceAccountFile = serde_json::from_str(content).map_err(|e| {
            BookingError::ServiceUnavailable(format!("invalid service account key file: {e}"))
        })?;
        let signing_key = EncodingKey::from_rsa_pem(parsed.private_key.as_bytes()).map_err(|e| {
            BookingError::ServiceUnavailable(format!("invalid service account private key: {e}"))
        })?;
        Ok(Self {
            client_email: parsed.client_email,
            token_uri: parsed
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            signing_key,
        })
    }

    fn assertion(&self, issued_at: i64) -> Result<String, BookingError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: CALENDAR_SCOPES,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| BookingError::ServiceUnavailable(format!("failed to sign assertion: {e}")))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

struct CachedToken {
    value: String,
    refresh_after: i64,
}

/// Exchanges a signed service-account assertion for an access token and
/// reuses it until shortly before it expires.
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, timeout: Duration) -> Result<Self, BookingError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BookingError::Configuration(format!("cannot build HTTP client: {e}")))?;
        info!(client_email = %key.client_email, "service account credentials loaded");
        Ok(Self {
            key,
            http,
            cached: Mutex::new(None),
        })
    }

    async fn fetch(&self, now: i64) -> Result<CachedToken, BookingError> {
        let assertion = self.key.assertion(now)?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(BookingError::Remote {
                status: status.as_u16(),
                message: format!("token exchange failed: {text}"),
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&text).map_err(|e| BookingError::Remote {
            status: status.as_u16(),
            message: format!("unreadable token response: {e}"),
        })?;
        let lifetime = parsed.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        debug!(lifetime, "calendar access token refreshed");
        Ok(CachedToken {
            value: parsed.access_token,
            refresh_after: now + lifetime - REFRESH_MARGIN_SECS,
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String, BookingError> {
        let now = Utc::now().timestamp();
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.refresh_after > now {
                return Ok(token.value.clone());
            }
        }
        let fresh = self.fetch(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}
