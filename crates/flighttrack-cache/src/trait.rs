//! Cache trait definition for dependency injection.

use async_trait::async_trait;
use flighttrack_core::FlightRecord;

use crate::error::CacheError;
use crate::stats::CacheStats;

/// Cache abstraction over a single tier of flight records.
///
/// Both tiers (local in-memory and remote Redis) implement this trait, so
/// the [`crate::TieredCache`] orchestrator and tests can treat them
/// interchangeably.
///
/// Keys are opaque exact-match strings; callers normalize them (trimmed,
/// uppercased, see [`flighttrack_core::normalize_key`]) before any tier is
/// consulted. A blank key behaves as a miss/no-op, never an error.
#[async_trait]
pub trait FlightCache: Send + Sync {
    /// Get a cached record.
    ///
    /// Returns `None` for unknown, expired, or blank keys. Never fails for
    /// an unknown key.
    async fn get(&self, key: &str) -> Option<FlightRecord>;

    /// Store a record, overwriting any existing entry for the key.
    /// Idempotent.
    async fn put(&self, key: &str, record: FlightRecord) -> Result<(), CacheError>;

    /// Remove an entry. Returns whether an entry existed before removal.
    async fn delete(&self, key: &str) -> bool;

    /// Presence check without materializing the value.
    async fn exists(&self, key: &str) -> bool;

    /// Remove all entries. Bulk operation, not expected to be frequent or
    /// low-latency.
    async fn clear(&self);

    /// Snapshot of the tier's running statistics.
    fn stats(&self) -> CacheStats;

    /// Short tier name used in logs.
    fn name(&self) -> &'static str;
}

/// Cache implementation that never stores anything.
///
/// Used as the remote tier when Redis is disabled, and in tests.
#[derive(Debug, Clone, Default)]
pub struct NoOpCache;

impl NoOpCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FlightCache for NoOpCache {
    async fn get(&self, _key: &str) -> Option<FlightRecord> {
        None
    }

    async fn put(&self, _key: &str, _record: FlightRecord) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> bool {
        false
    }

    async fn exists(&self, _key: &str) -> bool {
        false
    }

    async fn clear(&self) {}

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
