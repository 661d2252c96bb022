//! Flight lookup and search over the tiered cache and the upstream source.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use flighttrack_cache::{CacheStats, FlightCache, TieredCache};
use flighttrack_core::{FlightRecord, FlightStatus, normalize_key};
use flighttrack_opensky::OpenSkyProvider;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Largest page a search caller may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Abstraction over the upstream telemetry fetch, so the service can be
/// exercised against a scripted source in tests.
#[async_trait]
pub trait FlightSource: Send + Sync {
    async fn fetch_all(&self) -> Vec<FlightRecord>;
    async fn fetch_in_area(
        &self,
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Vec<FlightRecord>;
}

#[async_trait]
impl FlightSource for OpenSkyProvider {
    async fn fetch_all(&self) -> Vec<FlightRecord> {
        OpenSkyProvider::fetch_all(self).await
    }

    async fn fetch_in_area(
        &self,
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Vec<FlightRecord> {
        OpenSkyProvider::fetch_in_area(self, min_lat, max_lat, min_lon, max_lon).await
    }
}

/// One page of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

/// Route and schedule view of a flight, without the position fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightMetadata {
    pub flight_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_airport_icao: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_airport_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_airport_icao: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_airport_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_departure_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_departure_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_arrival_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_arrival_time: Option<String>,
    pub last_updated: i64,
}

impl From<&FlightRecord> for FlightMetadata {
    fn from(record: &FlightRecord) -> Self {
        Self {
            flight_id: record.flight_id.clone(),
            callsign: record.callsign.clone(),
            flight_number: record.flight_number.clone(),
            departure_airport_icao: record.departure_airport_icao.clone(),
            departure_airport_name: record.departure_airport_name.clone(),
            destination_airport_icao: record.destination_airport_icao.clone(),
            destination_airport_name: record.destination_airport_name.clone(),
            scheduled_departure_time: record.scheduled_departure_time.clone(),
            actual_departure_time: record.actual_departure_time.clone(),
            scheduled_arrival_time: record.scheduled_arrival_time.clone(),
            estimated_arrival_time: record.estimated_arrival_time.clone(),
            last_updated: record.last_updated,
        }
    }
}

/// Which end of a route an airport search matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AirportRole {
    Departure,
    Arrival,
    #[default]
    Both,
}

/// Serves flight lookups cache-first and keeps the latest upstream snapshot
/// for search and streaming.
pub struct FlightService {
    cache: Arc<TieredCache>,
    source: Arc<dyn FlightSource>,
    /// Most recent non-empty fetch. Replaced wholesale; an empty fetch
    /// (upstream outage) leaves the previous snapshot in place.
    snapshot: ArcSwap<Vec<FlightRecord>>,
}

impl FlightService {
    pub fn new(cache: Arc<TieredCache>, source: Arc<dyn FlightSource>) -> Self {
        Self {
            cache,
            source,
            snapshot: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Fetch all flights upstream, write them through the cache, and publish
    /// the result as the current snapshot.
    ///
    /// Each record is cached under its flight id and, when present, its
    /// callsign, so lookups by either key hit.
    pub async fn refresh_snapshot(&self) -> Arc<Vec<FlightRecord>> {
        let flights = self.source.fetch_all().await;
        if flights.is_empty() {
            tracing::warn!("upstream snapshot empty, keeping previous snapshot");
            return self.snapshot.load_full();
        }

        for record in &flights {
            if let Some(key) = normalize_key(&record.flight_id) {
                if let Err(e) = self.cache.put(&key, record.clone()).await {
                    tracing::warn!(key = %key, error = %e, "cache write-through failed");
                }
            }
            if let Some(alias) = record.callsign.as_deref().and_then(normalize_key) {
                if let Err(e) = self.cache.put(&alias, record.clone()).await {
                    tracing::warn!(key = %alias, error = %e, "cache write-through failed");
                }
            }
        }

        let snapshot = Arc::new(flights);
        self.snapshot.store(Arc::clone(&snapshot));
        tracing::debug!(flights = snapshot.len(), "snapshot refreshed");
        snapshot
    }

    /// Current snapshot, refreshing it first if none has been published yet.
    async fn current_snapshot(&self) -> Arc<Vec<FlightRecord>> {
        let snapshot = self.snapshot.load_full();
        if snapshot.is_empty() {
            return self.refresh_snapshot().await;
        }
        snapshot
    }

    /// Look up one flight by id or callsign. Cache-first; a miss triggers a
    /// full upstream refresh before concluding the flight is unknown.
    pub async fn get_flight_by_id(&self, id: &str) -> Result<FlightRecord, ApiError> {
        let key = normalize_key(id)
            .ok_or_else(|| ApiError::BadRequest("flight id must not be blank".into()))?;

        if let Some(record) = self.cache.get(&key).await {
            return Ok(record);
        }

        self.refresh_snapshot().await;

        self.cache
            .get(&key)
            .await
            .ok_or_else(|| ApiError::NotFound(key))
    }

    pub async fn get_flight_status(&self, id: &str) -> Result<FlightStatus, ApiError> {
        Ok(self.get_flight_by_id(id).await?.status)
    }

    pub async fn get_flight_metadata(&self, id: &str) -> Result<FlightMetadata, ApiError> {
        Ok(FlightMetadata::from(&self.get_flight_by_id(id).await?))
    }

    /// Case-insensitive substring search over flight id, callsign, and
    /// flight number.
    pub async fn search_flights(
        &self,
        query: &str,
        page: usize,
        size: usize,
    ) -> Result<Page<FlightRecord>, ApiError> {
        let needle = query.trim().to_uppercase();
        if needle.is_empty() {
            return Err(ApiError::BadRequest("query must not be blank".into()));
        }

        let snapshot = self.current_snapshot().await;
        let matches: Vec<FlightRecord> = snapshot
            .iter()
            .filter(|f| {
                f.flight_id.to_uppercase().contains(&needle)
                    || matches_substring(f.callsign.as_deref(), &needle)
                    || matches_substring(f.flight_number.as_deref(), &needle)
            })
            .cloned()
            .collect();

        Ok(paginate(matches, page, size))
    }

    /// Exact callsign match, case-insensitive.
    pub async fn search_by_callsign(&self, callsign: &str) -> Result<Vec<FlightRecord>, ApiError> {
        let wanted = normalize_key(callsign)
            .ok_or_else(|| ApiError::BadRequest("callsign must not be blank".into()))?;

        let snapshot = self.current_snapshot().await;
        Ok(snapshot
            .iter()
            .filter(|f| {
                f.callsign
                    .as_deref()
                    .and_then(normalize_key)
                    .is_some_and(|c| c == wanted)
            })
            .cloned()
            .collect())
    }

    /// Flights touching the given airport ICAO code on the requested end of
    /// their route.
    pub async fn search_by_airport(
        &self,
        icao: &str,
        role: AirportRole,
    ) -> Result<Vec<FlightRecord>, ApiError> {
        let wanted = normalize_key(icao)
            .ok_or_else(|| ApiError::BadRequest("airport icao must not be blank".into()))?;

        let snapshot = self.current_snapshot().await;
        Ok(snapshot
            .iter()
            .filter(|f| {
                let departure = matches_exact(f.departure_airport_icao.as_deref(), &wanted);
                let arrival = matches_exact(f.destination_airport_icao.as_deref(), &wanted);
                match role {
                    AirportRole::Departure => departure,
                    AirportRole::Arrival => arrival,
                    AirportRole::Both => departure || arrival,
                }
            })
            .cloned()
            .collect())
    }

    /// Live flights inside a bounding box, fetched directly upstream.
    pub async fn flights_in_area(
        &self,
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Vec<FlightRecord> {
        self.source
            .fetch_in_area(min_lat, max_lat, min_lon, max_lon)
            .await
    }

    pub fn cache_stats(&self) -> (CacheStats, CacheStats) {
        (self.cache.local_stats(), self.cache.remote_stats())
    }
}

fn matches_substring(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|v| v.to_uppercase().contains(needle))
}

fn matches_exact(field: Option<&str>, wanted: &str) -> bool {
    field.and_then(normalize_key).is_some_and(|v| v == wanted)
}

fn paginate(matches: Vec<FlightRecord>, page: usize, size: usize) -> Page<FlightRecord> {
    let size = size.clamp(1, MAX_PAGE_SIZE);
    let total_elements = matches.len();
    let total_pages = total_elements.div_ceil(size);
    let items: Vec<FlightRecord> = matches
        .into_iter()
        .skip(page.saturating_mul(size))
        .take(size)
        .collect();
    Page {
        items,
        page,
        size,
        total_elements,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flighttrack_cache::{FlightCache, LocalCache, NoOpCache};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        flights: Vec<FlightRecord>,
        fetches: AtomicUsize,
    }

    impl StubSource {
        fn new(flights: Vec<FlightRecord>) -> Self {
            Self {
                flights,
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FlightSource for StubSource {
        async fn fetch_all(&self) -> Vec<FlightRecord> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.flights.clone()
        }

        async fn fetch_in_area(
            &self,
            min_lat: f64,
            max_lat: f64,
            min_lon: f64,
            max_lon: f64,
        ) -> Vec<FlightRecord> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.flights
                .iter()
                .filter(|f| {
                    f.latitude >= min_lat
                        && f.latitude <= max_lat
                        && f.longitude >= min_lon
                        && f.longitude <= max_lon
                })
                .cloned()
                .collect()
        }
    }

    fn flight(id: &str, callsign: Option<&str>, lat: f64, lon: f64) -> FlightRecord {
        let mut record = FlightRecord::new(id);
        record.callsign = callsign.map(str::to_string);
        record.latitude = lat;
        record.longitude = lon;
        record.status = FlightStatus::InFlight;
        record.last_updated = 1_700_000_000_000;
        record
    }

    fn service_with(flights: Vec<FlightRecord>) -> (FlightService, Arc<StubSource>) {
        let cache = Arc::new(TieredCache::new(
            Arc::new(LocalCache::with_defaults()),
            Arc::new(NoOpCache),
        ));
        let source = Arc::new(StubSource::new(flights));
        let service = FlightService::new(cache, Arc::clone(&source) as Arc<dyn FlightSource>);
        (service, source)
    }

    #[tokio::test]
    async fn test_cache_hit_skips_upstream() {
        let (service, source) = service_with(vec![]);
        service
            .cache
            .put("ABC123", flight("abc123", None, 50.0, 8.5))
            .await
            .unwrap();

        let found = service.get_flight_by_id("abc123").await.unwrap();
        assert_eq!(found.flight_id, "abc123");
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_miss_fetches_and_caches() {
        let (service, source) = service_with(vec![
            flight("abc123", Some("DLH400"), 50.0, 8.5),
            flight("def456", Some("BAW22"), 51.5, -0.4),
        ]);

        let found = service.get_flight_by_id("abc123").await.unwrap();
        assert_eq!(found.flight_id, "abc123");
        assert_eq!(source.fetch_count(), 1);

        // Second lookup is served from the cache.
        service.get_flight_by_id("abc123").await.unwrap();
        // So is a lookup by the callsign alias of the other flight.
        let by_callsign = service.get_flight_by_id("baw22").await.unwrap();
        assert_eq!(by_callsign.flight_id, "def456");
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_id_is_bad_request() {
        let (service, _) = service_with(vec![]);
        let err = service.get_flight_by_id("   ").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found_after_refresh() {
        let (service, source) = service_with(vec![flight("abc123", None, 50.0, 8.5)]);
        let err = service.get_flight_by_id("zzz999").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_status_and_metadata_views() {
        let mut record = flight("abc123", Some("DLH400"), 50.0, 8.5);
        record.departure_airport_icao = Some("EDDF".into());
        record.destination_airport_icao = Some("KJFK".into());
        let (service, _) = service_with(vec![record]);

        let status = service.get_flight_status("abc123").await.unwrap();
        assert_eq!(status, FlightStatus::InFlight);

        let metadata = service.get_flight_metadata("abc123").await.unwrap();
        assert_eq!(metadata.departure_airport_icao.as_deref(), Some("EDDF"));
        assert_eq!(metadata.destination_airport_icao.as_deref(), Some("KJFK"));
    }

    #[tokio::test]
    async fn test_search_substring_case_insensitive() {
        let (service, _) = service_with(vec![
            flight("abc123", Some("DLH400"), 50.0, 8.5),
            flight("def456", Some("DLH8FK"), 48.1, 11.6),
            flight("aaa111", Some("BAW22"), 51.5, -0.4),
        ]);

        let page = service.search_flights("dlh", 0, 20).await.unwrap();
        assert_eq!(page.total_elements, 2);
        assert_eq!(page.total_pages, 1);

        let err = service.search_flights("  ", 0, 20).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_search_pagination_clamps_size() {
        let flights: Vec<FlightRecord> = (0..250)
            .map(|i| flight(&format!("dlh{i:03}"), None, 50.0, 8.5))
            .collect();
        let (service, _) = service_with(flights);

        let page = service.search_flights("dlh", 0, 1000).await.unwrap();
        assert_eq!(page.size, MAX_PAGE_SIZE);
        assert_eq!(page.items.len(), MAX_PAGE_SIZE);
        assert_eq!(page.total_elements, 250);
        assert_eq!(page.total_pages, 3);

        let last = service.search_flights("dlh", 2, 100).await.unwrap();
        assert_eq!(last.items.len(), 50);

        let beyond = service.search_flights("dlh", 9, 100).await.unwrap();
        assert!(beyond.items.is_empty());
    }

    #[tokio::test]
    async fn test_search_by_callsign_exact_only() {
        let (service, _) = service_with(vec![
            flight("abc123", Some("DLH400"), 50.0, 8.5),
            flight("def456", Some("DLH4001"), 48.1, 11.6),
        ]);

        let found = service.search_by_callsign("dlh400").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].flight_id, "abc123");
    }

    #[tokio::test]
    async fn test_search_by_airport_roles() {
        let mut outbound = flight("abc123", None, 50.0, 8.5);
        outbound.departure_airport_icao = Some("EDDF".into());
        let mut inbound = flight("def456", None, 48.1, 11.6);
        inbound.destination_airport_icao = Some("EDDF".into());
        let (service, _) = service_with(vec![outbound, inbound]);

        let departures = service
            .search_by_airport("eddf", AirportRole::Departure)
            .await
            .unwrap();
        assert_eq!(departures.len(), 1);
        assert_eq!(departures[0].flight_id, "abc123");

        let arrivals = service
            .search_by_airport("EDDF", AirportRole::Arrival)
            .await
            .unwrap();
        assert_eq!(arrivals.len(), 1);
        assert_eq!(arrivals[0].flight_id, "def456");

        let both = service
            .search_by_airport("EDDF", AirportRole::Both)
            .await
            .unwrap();
        assert_eq!(both.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_fetch_keeps_previous_snapshot() {
        let (service, _) = service_with(vec![flight("abc123", None, 50.0, 8.5)]);
        let first = service.refresh_snapshot().await;
        assert_eq!(first.len(), 1);

        // Swap in a source that now fails (returns nothing).
        let outage = FlightService {
            cache: Arc::clone(&service.cache),
            source: Arc::new(StubSource::new(vec![])),
            snapshot: ArcSwap::from(service.snapshot.load_full()),
        };
        let kept = outage.refresh_snapshot().await;
        assert_eq!(kept.len(), 1);
    }

    #[tokio::test]
    async fn test_flights_in_area_filters_by_bounding_box() {
        let (service, _) = service_with(vec![
            flight("abc123", None, 47.4, 8.5),
            flight("def456", None, 60.2, 24.9),
        ]);

        let inside = service.flights_in_area(45.0, 50.0, 5.0, 11.0).await;
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].flight_id, "abc123");
    }
}
