//! REST and SSE request handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use futures_util::Stream;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;

use flighttrack_core::{FlightRecord, normalize_key};

use crate::error::ApiError;
use crate::server::AppState;
use crate::service::{AirportRole, FlightMetadata, FlightService, Page};

pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "flighttrack",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn readyz(State(state): State<AppState>) -> Json<Value> {
    let (local, _) = state.service.cache_stats();
    Json(json!({
        "status": "ok",
        "cachedFlights": local.size,
        "streamSubscribers": state.broadcaster.subscriber_count(),
    }))
}

pub async fn get_flight(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FlightRecord>, ApiError> {
    Ok(Json(state.service.get_flight_by_id(&id).await?))
}

pub async fn get_flight_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let status = state.service.get_flight_status(&id).await?;
    // A successful lookup implies the id normalized; echo the cache-key form.
    Ok(Json(json!({
        "flightId": normalize_key(&id).unwrap_or_default(),
        "status": status,
    })))
}

pub async fn get_flight_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FlightMetadata>, ApiError> {
    Ok(Json(state.service.get_flight_metadata(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

fn default_page_size() -> usize {
    20
}

pub async fn search_flights(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<FlightRecord>>, ApiError> {
    let page = state
        .service
        .search_flights(&params.query, params.page, params.size)
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct CallsignParams {
    #[serde(default)]
    pub callsign: String,
}

pub async fn search_by_callsign(
    State(state): State<AppState>,
    Query(params): Query<CallsignParams>,
) -> Result<Json<Vec<FlightRecord>>, ApiError> {
    Ok(Json(
        state.service.search_by_callsign(&params.callsign).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct AirportParams {
    #[serde(default)]
    pub icao: String,
    #[serde(default, rename = "type")]
    pub role: AirportRole,
}

pub async fn search_by_airport(
    State(state): State<AppState>,
    Query(params): Query<AirportParams>,
) -> Result<Json<Vec<FlightRecord>>, ApiError> {
    Ok(Json(
        state
            .service
            .search_by_airport(&params.icao, params.role)
            .await?,
    ))
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<Value> {
    let (local, remote) = state.service.cache_stats();
    Json(json!({
        "local": { "stats": &local, "hitRate": local.hit_rate() },
        "remote": { "stats": &remote, "hitRate": remote.hit_rate() },
    }))
}

/// SSE stream of full flight snapshots, one event per poll tick.
pub async fn stream_flights(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(snapshot) => match snapshot_event(&snapshot) {
                    Some(event) => return Some((Ok(event), rx)),
                    None => continue,
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "slow SSE subscriber skipped snapshots");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaParams {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl AreaParams {
    fn validate(&self) -> Result<(), ApiError> {
        if !(-90.0..=90.0).contains(&self.min_lat) || !(-90.0..=90.0).contains(&self.max_lat) {
            return Err(ApiError::BadRequest(
                "latitude must be within [-90, 90]".into(),
            ));
        }
        if !(-180.0..=180.0).contains(&self.min_lon) || !(-180.0..=180.0).contains(&self.max_lon) {
            return Err(ApiError::BadRequest(
                "longitude must be within [-180, 180]".into(),
            ));
        }
        if self.min_lat > self.max_lat || self.min_lon > self.max_lon {
            return Err(ApiError::BadRequest(
                "min bounds must not exceed max bounds".into(),
            ));
        }
        Ok(())
    }
}

/// SSE stream of flights inside a bounding box, polled upstream per
/// connection.
pub async fn stream_flights_in_area(
    State(state): State<AppState>,
    Query(params): Query<AreaParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    params.validate()?;

    let stream = futures_util::stream::unfold(
        AreaStreamState {
            service: Arc::clone(&state.service),
            ticker: tokio::time::interval(state.stream_interval),
            params,
        },
        |mut st| async move {
            loop {
                st.ticker.tick().await;
                let flights = st
                    .service
                    .flights_in_area(
                        st.params.min_lat,
                        st.params.max_lat,
                        st.params.min_lon,
                        st.params.max_lon,
                    )
                    .await;
                match snapshot_event(&flights) {
                    Some(event) => return Some((Ok(event), st)),
                    None => continue,
                }
            }
        },
    );
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

struct AreaStreamState {
    service: Arc<FlightService>,
    ticker: tokio::time::Interval,
    params: AreaParams,
}

fn snapshot_event(flights: &[FlightRecord]) -> Option<Event> {
    match Event::default().event("flights").json_data(flights) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize flight snapshot event");
            None
        }
    }
}
