//! Two-tier caching system for flight records.
//!
//! ## Architecture
//!
//! - **Local tier (DashMap)**: In-memory, microsecond latency, per-instance,
//!   bounded by size and TTL.
//! - **Remote tier (Redis)**: Network, millisecond latency, shared across
//!   service instances.
//! - **[`TieredCache`]**: Composes both tiers with read-through and
//!   write-through policy.
//!
//! ## Cache Hierarchy
//!
//! ```text
//! get(key) → local (DashMap) → remote (Redis) → caller fetches upstream
//! ```
//!
//! A remote hit backfills the local tier without blocking the read.
//!
//! ## Graceful Degradation
//!
//! Remote tier unavailability never surfaces as an error: every failed
//! remote operation degrades to a miss/false/no-op and is logged at warn
//! level, leaving the system in local-only mode.

pub mod error;
pub mod local;
pub mod remote;
pub mod stats;
pub mod tiered;
mod r#trait;

pub use error::CacheError;
pub use local::{LocalCache, LocalCacheConfig};
pub use remote::{RedisCache, RedisCacheConfig};
pub use stats::CacheStats;
pub use tiered::TieredCache;
pub use r#trait::{FlightCache, NoOpCache};
