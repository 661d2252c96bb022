//! Remote Redis cache tier.
//!
//! Shared across service instances. Every operation is a network round trip
//! bounded by a per-op timeout, and every infrastructure failure degrades to
//! a miss/false/no-op: a Redis outage must never surface as a user-facing
//! error, it only demotes the system to local-cache-only behavior.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use flighttrack_core::FlightRecord;
use redis::AsyncCommands;

use crate::error::CacheError;
use crate::r#trait::FlightCache;
use crate::stats::CacheStats;

/// Namespace prefix for flight keys in the shared store.
const KEY_PREFIX: &str = "flight:";

/// Configuration for the Redis tier.
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// TTL applied to every stored record.
    pub ttl: Duration,
    /// Timeout for point operations (get/put/delete/exists).
    pub op_timeout: Duration,
    /// Timeout for the bulk `clear` scan.
    pub clear_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            op_timeout: Duration::from_secs(2),
            clear_timeout: Duration::from_secs(30),
        }
    }
}

/// Redis-backed flight cache tier.
pub struct RedisCache {
    pool: Pool,
    ttl: Duration,
    op_timeout: Duration,
    clear_timeout: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RedisCache {
    pub fn new(pool: Pool, config: RedisCacheConfig) -> Self {
        Self {
            pool,
            ttl: config.ttl,
            op_timeout: config.op_timeout,
            clear_timeout: config.clear_timeout,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn build_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    fn is_blank(key: &str) -> bool {
        key.trim().is_empty()
    }

    async fn try_get(&self, key: &str) -> Result<Option<FlightRecord>, CacheError> {
        let redis_key = Self::build_key(key);
        let fut = async {
            let mut conn = self
                .pool
                .get()
                .await
                .map_err(|e| CacheError::Connection(e.to_string()))?;
            let payload: Option<String> = conn
                .get(&redis_key)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))?;
            match payload {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        };
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
    }

    async fn try_put(&self, key: &str, record: &FlightRecord) -> Result<(), CacheError> {
        let redis_key = Self::build_key(key);
        let json = serde_json::to_string(record)?;
        let ttl_secs = self.ttl.as_secs();
        let fut = async {
            let mut conn = self
                .pool
                .get()
                .await
                .map_err(|e| CacheError::Connection(e.to_string()))?;
            conn.set_ex::<_, _, ()>(&redis_key, json, ttl_secs)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))
        };
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
    }

    async fn try_delete(&self, key: &str) -> Result<bool, CacheError> {
        let redis_key = Self::build_key(key);
        let fut = async {
            let mut conn = self
                .pool
                .get()
                .await
                .map_err(|e| CacheError::Connection(e.to_string()))?;
            let removed: usize = conn
                .del(&redis_key)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))?;
            Ok(removed > 0)
        };
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
    }

    async fn try_exists(&self, key: &str) -> Result<bool, CacheError> {
        let redis_key = Self::build_key(key);
        let fut = async {
            let mut conn = self
                .pool
                .get()
                .await
                .map_err(|e| CacheError::Connection(e.to_string()))?;
            conn.exists(&redis_key)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))
        };
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
    }

    /// SCAN the `flight:` namespace and delete what it finds.
    ///
    /// Scoped to our prefix: the store is shared with unrelated data, so a
    /// FLUSHDB would be hostile to neighbors.
    async fn try_clear(&self) -> Result<usize, CacheError> {
        let fut = async {
            let mut conn = self
                .pool
                .get()
                .await
                .map_err(|e| CacheError::Connection(e.to_string()))?;

            let mut keys: Vec<String> = Vec::new();
            {
                let mut iter = conn
                    .scan_match::<_, String>(format!("{KEY_PREFIX}*"))
                    .await
                    .map_err(|e| CacheError::Command(e.to_string()))?;
                while let Some(key) = iter.next_item().await {
                    keys.push(key);
                }
            }

            if keys.is_empty() {
                return Ok(0);
            }
            let removed: usize = conn
                .del(&keys)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))?;
            Ok(removed)
        };
        tokio::time::timeout(self.clear_timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout(self.clear_timeout))?
    }
}

#[async_trait]
impl FlightCache for RedisCache {
    async fn get(&self, key: &str) -> Option<FlightRecord> {
        if Self::is_blank(key) {
            return None;
        }
        match self.try_get(key).await {
            Ok(Some(record)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(record)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis GET failed, degrading to miss");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn put(&self, key: &str, record: FlightRecord) -> Result<(), CacheError> {
        if Self::is_blank(key) {
            return Ok(());
        }
        if let Err(e) = self.try_put(key, &record).await {
            // A remote outage degrades to local-only mode; never fail the write.
            tracing::warn!(key = %key, error = %e, "Redis SET failed, continuing without remote tier");
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> bool {
        if Self::is_blank(key) {
            return false;
        }
        match self.try_delete(key).await {
            Ok(existed) => existed,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis DEL failed, degrading to false");
                false
            }
        }
    }

    async fn exists(&self, key: &str) -> bool {
        if Self::is_blank(key) {
            return false;
        }
        match self.try_exists(key).await {
            Ok(present) => present,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis EXISTS failed, degrading to false");
                false
            }
        }
    }

    async fn clear(&self) {
        match self.try_clear().await {
            Ok(removed) => tracing::warn!(removed, "cleared flight entries from Redis"),
            Err(e) => tracing::warn!(error = %e, "failed to clear Redis cache"),
        }
    }

    /// Hit/miss counters are tracked per-instance; `size` is not reported
    /// for the remote tier (counting keys would be a full scan).
    fn stats(&self) -> CacheStats {
        CacheStats {
            size: 0,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: 0,
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
