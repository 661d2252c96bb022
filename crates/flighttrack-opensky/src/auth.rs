//! OAuth2 credential manager for the OpenSky API.
//!
//! Holds one bearer token for the whole process. The happy path is a single
//! atomic pointer load; only an expired or absent token takes the refresh
//! mutex. Double-checked re-validation under the lock guarantees that any
//! number of concurrent callers observing an expired token produce exactly
//! one refresh request, with everyone else blocking until it completes and
//! then reading the freshly installed token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::OpenSkyConfig;
use crate::error::AuthError;

/// Token plus its proactive expiry, private to the manager.
#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Manages acquisition, caching, and refresh of the OpenSky bearer token.
pub struct OpenSkyAuthClient {
    http: reqwest::Client,
    auth_url: String,
    client_id: String,
    client_secret: String,
    /// Safety-margin validity applied to each fresh token.
    validity: Duration,
    token: ArcSwapOption<CachedToken>,
    refresh_lock: Mutex<()>,
}

impl OpenSkyAuthClient {
    pub fn new(config: &OpenSkyConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            auth_url: config.auth_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            validity: config.token_validity(),
            token: ArcSwapOption::const_empty(),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Return a token that is valid under the configured safety margin,
    /// refreshing it if necessary.
    ///
    /// The fast path is lock-free. On the slow path the refresh mutex is
    /// held only for "re-check, maybe refresh, install" and is released on
    /// every exit, so a failed refresh never wedges later attempts.
    pub async fn get_valid_token(&self) -> Result<String, AuthError> {
        if let Some(cached) = self.token.load_full() {
            if cached.is_valid() {
                return Ok(cached.access_token.clone());
            }
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have finished a refresh while we waited.
        if let Some(cached) = self.token.load_full() {
            if cached.is_valid() {
                return Ok(cached.access_token.clone());
            }
        }

        let access_token = self.refresh().await?;
        self.token.store(Some(Arc::new(CachedToken {
            access_token: access_token.clone(),
            expires_at: Instant::now() + self.validity,
        })));
        Ok(access_token)
    }

    /// Attach `Authorization: Bearer <token>` to an outgoing request.
    pub async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, AuthError> {
        let token = self.get_valid_token().await?;
        Ok(request.bearer_auth(token))
    }

    /// Client-credentials grant against the token endpoint.
    ///
    /// Fails loudly: a non-success status, a transport error, or a response
    /// without an `access_token` field all propagate to the caller.
    async fn refresh(&self) -> Result<String, AuthError> {
        tracing::info!("refreshing OpenSky access token");

        let response = self
            .http
            .post(&self.auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "token refresh rejected");
            return Err(AuthError::Status(status.as_u16()));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        let access_token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::MalformedResponse("access_token absent".into()))?;

        tracing::info!(valid_for = ?self.validity, "token refreshed");
        Ok(access_token)
    }
}
