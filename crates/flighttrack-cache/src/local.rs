//! Local in-memory cache tier.
//!
//! Bounded DashMap with TTL-based lazy expiry and deterministic
//! insertion-order (FIFO) eviction. All operations complete synchronously in
//! the calling task; no I/O, no locks held across await points.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use flighttrack_core::FlightRecord;

use crate::error::CacheError;
use crate::r#trait::FlightCache;
use crate::stats::CacheStats;

/// Configuration for the local tier.
#[derive(Debug, Clone)]
pub struct LocalCacheConfig {
    /// Maximum number of entries before insertion-order eviction kicks in.
    pub max_size: usize,
    /// Time-to-live for entries; expired entries behave as misses.
    pub ttl: Duration,
}

impl Default for LocalCacheConfig {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            ttl: Duration::from_secs(10 * 60),
        }
    }
}

struct CachedEntry {
    record: FlightRecord,
    expires_at: Instant,
    /// Monotonic insertion stamp; lets the eviction queue skip stale nodes
    /// left behind by overwrites and deletes.
    generation: u64,
}

/// Local in-memory flight cache.
///
/// Thread-safe for concurrent get/put/delete from many request-handling
/// tasks. Expiry is lazy: an expired-but-present entry is removed (and
/// counted as an eviction) the next time it is observed.
pub struct LocalCache {
    entries: DashMap<String, CachedEntry>,
    /// Insertion order as (key, generation) pairs; front is oldest.
    order: Mutex<VecDeque<(String, u64)>>,
    max_size: usize,
    ttl: Duration,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl LocalCache {
    pub fn new(config: LocalCacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            max_size: config.max_size.max(1),
            ttl: config.ttl,
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(LocalCacheConfig::default())
    }

    fn is_blank(key: &str) -> bool {
        key.trim().is_empty()
    }

    /// Drop an expired entry, counting it as an eviction.
    fn expire(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Evict oldest-inserted entries until the map is under capacity.
    ///
    /// Queue nodes whose generation no longer matches the live entry are
    /// leftovers from overwrites or deletes and are skipped.
    fn evict_for_capacity(&self) {
        let mut order = self.order.lock().expect("eviction queue poisoned");
        while self.entries.len() > self.max_size {
            let Some((key, generation)) = order.pop_front() else {
                break;
            };
            let matches = self
                .entries
                .get(&key)
                .map(|e| e.generation == generation)
                .unwrap_or(false);
            if matches {
                self.entries.remove(&key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "evicted flight from local cache (capacity)");
            }
        }
        Self::prune_stale_front(&self.entries, &mut order);
        // Stale nodes can also hide behind a live front node; compact once
        // the queue outgrows the map it tracks.
        if order.len() > self.max_size.saturating_mul(2) {
            order.retain(|(key, generation)| {
                self.entries
                    .get(key)
                    .map(|e| e.generation == *generation)
                    .unwrap_or(false)
            });
        }
    }

    /// Pop queue nodes from the front that no longer describe a live entry.
    ///
    /// Overwrites and deletes leave their old nodes in the queue; without
    /// this the queue grows by one node per overwrite even though the map
    /// stays at a single entry.
    fn prune_stale_front(
        entries: &DashMap<String, CachedEntry>,
        order: &mut VecDeque<(String, u64)>,
    ) {
        loop {
            let stale = match order.front() {
                Some((key, generation)) => entries
                    .get(key)
                    .map(|e| e.generation != *generation)
                    .unwrap_or(true),
                None => break,
            };
            if !stale {
                break;
            }
            order.pop_front();
        }
    }
}

#[async_trait]
impl FlightCache for LocalCache {
    async fn get(&self, key: &str) -> Option<FlightRecord> {
        if Self::is_blank(key) {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.record.clone());
            }
            drop(entry);
            self.expire(key);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn put(&self, key: &str, record: FlightRecord) -> Result<(), CacheError> {
        if Self::is_blank(key) {
            return Ok(());
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let entry = CachedEntry {
            record,
            expires_at: Instant::now() + self.ttl,
            generation,
        };
        self.entries.insert(key.to_string(), entry);
        {
            let mut order = self.order.lock().expect("eviction queue poisoned");
            order.push_back((key.to_string(), generation));
        }
        self.evict_for_capacity();
        Ok(())
    }

    async fn delete(&self, key: &str) -> bool {
        if Self::is_blank(key) {
            return false;
        }
        let removed = self.entries.remove(key).is_some();
        if removed {
            let mut order = self.order.lock().expect("eviction queue poisoned");
            Self::prune_stale_front(&self.entries, &mut order);
        }
        removed
    }

    async fn exists(&self, key: &str) -> bool {
        if Self::is_blank(key) {
            return false;
        }
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => true,
            Some(_) => {
                self.expire(key);
                false
            }
            None => false,
        }
    }

    async fn clear(&self) {
        let removed = self.entries.len();
        self.entries.clear();
        self.order.lock().expect("eviction queue poisoned").clear();
        tracing::warn!(removed, "local cache cleared");
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
