//! OpenSky client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the OpenSky API and its auth endpoint.
///
/// `client_id` and `client_secret` are required and must be non-blank; the
/// service refuses to start without them (an invalid credential makes every
/// upstream call meaningless).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSkyConfig {
    /// OAuth2 client id for the client-credentials grant.
    #[serde(default)]
    pub client_id: String,
    /// OAuth2 client secret.
    #[serde(default)]
    pub client_secret: String,

    /// Base URL of the states API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Full URL of the token endpoint.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// How long a freshly issued token is treated as valid. Kept below the
    /// provider's real 30-minute window so we refresh proactively instead
    /// of racing hard expiry.
    #[serde(default = "default_token_validity_minutes")]
    pub token_validity_minutes: u64,

    /// HTTP timeout for auth and states requests.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_api_url() -> String {
    "https://opensky-network.org/api".into()
}

fn default_auth_url() -> String {
    "https://auth.opensky-network.org/auth/realms/opensky-network/protocol/openid-connect/token"
        .into()
}

fn default_token_validity_minutes() -> u64 {
    28
}

fn default_request_timeout_seconds() -> u64 {
    10
}

impl Default for OpenSkyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_url: default_api_url(),
            auth_url: default_auth_url(),
            token_validity_minutes: default_token_validity_minutes(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl OpenSkyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.client_id.trim().is_empty() {
            return Err("opensky.client_id must not be blank".into());
        }
        if self.client_secret.trim().is_empty() {
            return Err("opensky.client_secret must not be blank".into());
        }
        if self.api_url.trim().is_empty() || self.auth_url.trim().is_empty() {
            return Err("opensky.api_url and opensky.auth_url must not be blank".into());
        }
        Ok(())
    }

    pub fn token_validity(&self) -> Duration {
        Duration::from_secs(self.token_validity_minutes * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
