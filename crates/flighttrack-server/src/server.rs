//! Router assembly and server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Router, routing::get};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use flighttrack_cache::{FlightCache, LocalCache, NoOpCache, RedisCache, TieredCache};
use flighttrack_opensky::{OpenSkyAuthClient, OpenSkyProvider};

use crate::config::AppConfig;
use crate::handlers;
use crate::service::FlightService;
use crate::stream::FlightBroadcaster;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FlightService>,
    pub broadcaster: FlightBroadcaster,
    pub stream_interval: Duration,
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/api/flights/{id}", get(handlers::get_flight))
        .route("/api/flights/{id}/status", get(handlers::get_flight_status))
        .route(
            "/api/flights/{id}/metadata",
            get(handlers::get_flight_metadata),
        )
        .route("/api/search/flights", get(handlers::search_flights))
        .route(
            "/api/search/flights/callsign",
            get(handlers::search_by_callsign),
        )
        .route(
            "/api/search/flights/airport",
            get(handlers::search_by_airport),
        )
        .route("/api/cache/stats", get(handlers::cache_stats))
        .route("/stream/flights", get(handlers::stream_flights))
        .route(
            "/stream/flights/area",
            get(handlers::stream_flights_in_area),
        )
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn build(self) -> anyhow::Result<FlightTrackServer> {
        let cfg = self.config;

        let auth = Arc::new(
            OpenSkyAuthClient::new(&cfg.opensky).context("auth client initialization failed")?,
        );
        let provider = Arc::new(
            OpenSkyProvider::new(&cfg.opensky, auth).context("provider initialization failed")?,
        );

        let local: Arc<dyn FlightCache> =
            Arc::new(LocalCache::new(cfg.cache.local.to_cache_config()));
        let remote: Arc<dyn FlightCache> = if cfg.cache.redis.enabled {
            let pool = deadpool_redis::Config::from_url(&cfg.cache.redis.url)
                .builder()
                .context("redis pool configuration failed")?
                .max_size(cfg.cache.redis.pool_size)
                .runtime(deadpool_redis::Runtime::Tokio1)
                .build()
                .context("redis pool construction failed")?;
            tracing::info!(url = %cfg.cache.redis.url, "remote cache tier enabled");
            Arc::new(RedisCache::new(pool, cfg.cache.redis.to_cache_config()))
        } else {
            tracing::info!("remote cache tier disabled, running local-only");
            Arc::new(NoOpCache)
        };

        let cache = Arc::new(TieredCache::new(local, remote));
        let service = Arc::new(FlightService::new(cache, provider));
        let stream_interval = cfg.stream.interval();
        let broadcaster = FlightBroadcaster::start(Arc::clone(&service), stream_interval);

        let state = AppState {
            service,
            broadcaster,
            stream_interval,
        };

        Ok(FlightTrackServer {
            addr: cfg.addr(),
            app: build_app(state, &cfg),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct FlightTrackServer {
    addr: SocketAddr,
    app: Router,
}

impl FlightTrackServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::FlightSource;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use flighttrack_core::{FlightRecord, FlightStatus};
    use tower::ServiceExt;

    struct FixedSource(Vec<FlightRecord>);

    #[async_trait]
    impl FlightSource for FixedSource {
        async fn fetch_all(&self) -> Vec<FlightRecord> {
            self.0.clone()
        }

        async fn fetch_in_area(&self, _: f64, _: f64, _: f64, _: f64) -> Vec<FlightRecord> {
            self.0.clone()
        }
    }

    fn test_app(flights: Vec<FlightRecord>) -> Router {
        let cache = Arc::new(TieredCache::new(
            Arc::new(LocalCache::with_defaults()),
            Arc::new(NoOpCache),
        ));
        let service = Arc::new(FlightService::new(cache, Arc::new(FixedSource(flights))));
        // Long interval so the poller never fires during a test.
        let broadcaster =
            FlightBroadcaster::start(Arc::clone(&service), Duration::from_secs(3600));
        let state = AppState {
            service,
            broadcaster,
            stream_interval: Duration::from_secs(3600),
        };
        build_app(state, &AppConfig::default())
    }

    fn flight(id: &str, callsign: &str) -> FlightRecord {
        let mut record = FlightRecord::new(id);
        record.callsign = Some(callsign.to_string());
        record.latitude = 50.0;
        record.longitude = 8.5;
        record.status = FlightStatus::InFlight;
        record
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let app = test_app(vec![]);
        let response = app
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_get_flight_found_and_missing() {
        let app = test_app(vec![flight("abc123", "DLH400")]);

        let found = app
            .clone()
            .oneshot(
                Request::get("/api/flights/abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(found.status(), StatusCode::OK);
        assert_eq!(body_json(found).await["flightId"], "abc123");

        let missing = app
            .oneshot(
                Request::get("/api/flights/zzz999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_flight_status_endpoint() {
        let app = test_app(vec![flight("abc123", "DLH400")]);
        let response = app
            .oneshot(
                Request::get("/api/flights/abc123/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "IN_FLIGHT");
        assert_eq!(body["flightId"], "ABC123");
    }

    #[tokio::test]
    async fn test_flight_status_echoes_normalized_id() {
        let app = test_app(vec![flight("abc123", "DLH400")]);
        // Path id with surrounding whitespace normalizes to the cache key.
        let response = app
            .oneshot(
                Request::get("/api/flights/%20abc123%20/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["flightId"], "ABC123");
    }

    #[tokio::test]
    async fn test_search_blank_query_is_bad_request() {
        let app = test_app(vec![]);
        let response = app
            .oneshot(
                Request::get("/api/search/flights?query=%20")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_search_by_callsign_endpoint() {
        let app = test_app(vec![flight("abc123", "DLH400"), flight("def456", "BAW22")]);
        let response = app
            .oneshot(
                Request::get("/api/search/flights/callsign?callsign=dlh400")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["flightId"], "abc123");
    }

    #[tokio::test]
    async fn test_cache_stats_endpoint() {
        let app = test_app(vec![]);
        let response = app
            .oneshot(
                Request::get("/api/cache/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["local"]["stats"]["size"].is_number());
        assert!(body["remote"]["stats"]["size"].is_number());
    }

    #[tokio::test]
    async fn test_area_stream_rejects_inverted_bounds() {
        let app = test_app(vec![]);
        let response = app
            .oneshot(
                Request::get("/stream/flights/area?minLat=50&maxLat=40&minLon=0&maxLon=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
