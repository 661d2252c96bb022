//! OpenSky Network integration.
//!
//! Two pieces live here:
//!
//! - [`OpenSkyAuthClient`] — acquires, caches, and refreshes the OAuth2
//!   bearer token for the OpenSky API, with at most one refresh request in
//!   flight regardless of caller concurrency.
//! - [`OpenSkyProvider`] — fetches live state vectors and parses them into
//!   [`flighttrack_core::FlightRecord`]s, degrading to an empty snapshot on
//!   upstream failure.

pub mod auth;
pub mod config;
pub mod error;
pub mod provider;

pub use auth::OpenSkyAuthClient;
pub use config::OpenSkyConfig;
pub use error::{AuthError, ProviderError};
pub use provider::OpenSkyProvider;
