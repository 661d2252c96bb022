//! FlightTrack HTTP service.
//!
//! Wires the tiered flight cache and the OpenSky provider behind an axum
//! REST API with SSE streaming. See [`server::ServerBuilder`] for assembly
//! and [`config::AppConfig`] for the runtime configuration surface.

pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod server;
pub mod service;
pub mod stream;

pub use error::ApiError;
pub use server::{AppState, FlightTrackServer, ServerBuilder, build_app};
pub use service::{FlightService, FlightSource};
pub use stream::FlightBroadcaster;
