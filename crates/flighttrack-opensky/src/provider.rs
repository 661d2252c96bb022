//! State-vector fetcher for the OpenSky states API.
//!
//! The provider boundary never errors: any upstream failure yields an empty
//! snapshot, logged at warn level. The one exception worth a louder log is
//! an auth failure, since it means every subsequent call will fail too.

use std::sync::Arc;

use flighttrack_core::{FlightRecord, FlightStatus, now_millis};
use serde_json::Value;

use crate::auth::OpenSkyAuthClient;
use crate::config::OpenSkyConfig;
use crate::error::ProviderError;

/// State vectors shorter than this are malformed and skipped.
/// Indices used: 0 icao24, 1 callsign, 5 longitude, 6 latitude,
/// 7 baro altitude, 8 on_ground, 9 velocity.
const STATE_VECTOR_LEN: usize = 17;

/// Fetches live flight state from the OpenSky Network.
pub struct OpenSkyProvider {
    http: reqwest::Client,
    api_url: String,
    auth: Arc<OpenSkyAuthClient>,
}

impl OpenSkyProvider {
    pub fn new(config: &OpenSkyConfig, auth: Arc<OpenSkyAuthClient>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ProviderError::Request)?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Fetch all current flight states. Empty on any upstream failure.
    pub async fn fetch_all(&self) -> Vec<FlightRecord> {
        match self.try_fetch(&[]).await {
            Ok(flights) => flights,
            Err(e) => {
                self.log_fetch_failure(&e);
                Vec::new()
            }
        }
    }

    /// Fetch flight states within a bounding box. Empty on any upstream
    /// failure.
    pub async fn fetch_in_area(
        &self,
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Vec<FlightRecord> {
        let query = [
            ("lamin", min_lat.to_string()),
            ("lamax", max_lat.to_string()),
            ("lomin", min_lon.to_string()),
            ("lomax", max_lon.to_string()),
        ];
        match self.try_fetch(&query).await {
            Ok(flights) => flights,
            Err(e) => {
                self.log_fetch_failure(&e);
                Vec::new()
            }
        }
    }

    fn log_fetch_failure(&self, e: &ProviderError) {
        match e {
            ProviderError::Auth(inner) => {
                tracing::error!(error = %inner, "OpenSky authentication failed, returning empty snapshot")
            }
            other => tracing::warn!(error = %other, "OpenSky fetch failed, returning empty snapshot"),
        }
    }

    async fn try_fetch(&self, query: &[(&str, String)]) -> Result<Vec<FlightRecord>, ProviderError> {
        let mut request = self.http.get(format!("{}/states/all", self.api_url));
        if !query.is_empty() {
            request = request.query(query);
        }
        let request = self.auth.authorize(request).await?;

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        Ok(Self::parse_states(&body))
    }

    fn parse_states(body: &Value) -> Vec<FlightRecord> {
        let Some(states) = body.get("states").and_then(Value::as_array) else {
            return Vec::new();
        };

        states
            .iter()
            .filter_map(|state| state.as_array().and_then(|s| Self::parse_state_vector(s)))
            .filter(FlightRecord::has_position)
            .collect()
    }

    fn parse_state_vector(state: &[Value]) -> Option<FlightRecord> {
        if state.len() < STATE_VECTOR_LEN {
            return None;
        }

        let flight_id = get_string(state, 0)?;
        let on_ground = state.get(8).and_then(Value::as_bool).unwrap_or(false);

        let mut record = FlightRecord::new(flight_id);
        record.callsign = get_string(state, 1);
        record.longitude = get_f64(state, 5);
        record.latitude = get_f64(state, 6);
        record.altitude = get_f64(state, 7);
        record.speed = get_f64(state, 9);
        record.status = if on_ground {
            FlightStatus::Landed
        } else {
            FlightStatus::InFlight
        };
        record.last_updated = now_millis();
        Some(record)
    }
}

fn get_string(state: &[Value], index: usize) -> Option<String> {
    state
        .get(index)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn get_f64(state: &[Value], index: usize) -> f64 {
    state.get(index).and_then(Value::as_f64).unwrap_or(0.0)
}
