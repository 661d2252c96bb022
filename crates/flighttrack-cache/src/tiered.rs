//! Two-tier cache orchestrator.
//!
//! Composes a local and a remote tier behind the same [`FlightCache`]
//! contract. The local tier is availability-critical and low-latency; the
//! remote tier is best-effort sharing across instances. Policy:
//!
//! - reads never wait on the remote tier when the local tier can answer
//! - a remote hit repopulates the local tier without blocking the read
//! - remote unavailability never blocks or fails a request
//!
//! The orchestrator never calls the upstream provider; on a double miss the
//! caller decides whether to fetch.

use std::sync::Arc;

use async_trait::async_trait;
use flighttrack_core::FlightRecord;

use crate::error::CacheError;
use crate::r#trait::FlightCache;
use crate::stats::CacheStats;

/// Read-through / write-through composition of two cache tiers.
pub struct TieredCache {
    local: Arc<dyn FlightCache>,
    remote: Arc<dyn FlightCache>,
}

impl TieredCache {
    pub fn new(local: Arc<dyn FlightCache>, remote: Arc<dyn FlightCache>) -> Self {
        Self { local, remote }
    }

    /// Stats of the local tier (the observable one).
    pub fn local_stats(&self) -> CacheStats {
        self.local.stats()
    }

    /// Stats of the remote tier (per-instance hit/miss counters).
    pub fn remote_stats(&self) -> CacheStats {
        self.remote.stats()
    }
}

#[async_trait]
impl FlightCache for TieredCache {
    async fn get(&self, key: &str) -> Option<FlightRecord> {
        if let Some(record) = self.local.get(key).await {
            return Some(record);
        }

        let record = self.remote.get(key).await?;

        // Backfill the local tier fire-and-forget: the read result must not
        // depend on it.
        let local = Arc::clone(&self.local);
        let backfill_key = key.to_string();
        let backfill_record = record.clone();
        tokio::spawn(async move {
            if let Err(e) = local.put(&backfill_key, backfill_record).await {
                tracing::warn!(key = %backfill_key, error = %e, "local backfill after remote hit failed");
            }
        });

        tracing::debug!(key = %key, "remote cache hit, local backfill scheduled");
        Some(record)
    }

    async fn put(&self, key: &str, record: FlightRecord) -> Result<(), CacheError> {
        let (local_result, remote_result) = tokio::join!(
            self.local.put(key, record.clone()),
            self.remote.put(key, record),
        );

        // The local tier is always expected to be available; its failure is
        // the caller's problem. The remote tier is best-effort.
        if let Err(e) = remote_result {
            tracing::warn!(key = %key, error = %e, "remote write-through failed, continuing");
        }
        local_result
    }

    async fn delete(&self, key: &str) -> bool {
        let (local_existed, remote_existed) =
            tokio::join!(self.local.delete(key), self.remote.delete(key));
        local_existed || remote_existed
    }

    async fn exists(&self, key: &str) -> bool {
        if self.local.exists(key).await {
            return true;
        }
        self.remote.exists(key).await
    }

    async fn clear(&self) {
        tokio::join!(self.local.clear(), self.remote.clear());
    }

    fn stats(&self) -> CacheStats {
        self.local.stats()
    }

    fn name(&self) -> &'static str {
        "tiered"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{LocalCache, LocalCacheConfig};
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// In-memory stand-in for the remote tier with a switchable outage mode.
    #[derive(Default)]
    struct StubRemote {
        entries: DashMap<String, FlightRecord>,
        unreachable: AtomicBool,
        fail_puts_loudly: AtomicBool,
    }

    impl StubRemote {
        fn set_unreachable(&self, down: bool) {
            self.unreachable.store(down, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl FlightCache for StubRemote {
        async fn get(&self, key: &str) -> Option<FlightRecord> {
            if self.unreachable.load(Ordering::SeqCst) {
                return None;
            }
            self.entries.get(key).map(|e| e.clone())
        }

        async fn put(&self, key: &str, record: FlightRecord) -> Result<(), CacheError> {
            if self.fail_puts_loudly.load(Ordering::SeqCst) {
                return Err(CacheError::Connection("stub outage".into()));
            }
            if self.unreachable.load(Ordering::SeqCst) {
                return Ok(());
            }
            self.entries.insert(key.to_string(), record);
            Ok(())
        }

        async fn delete(&self, key: &str) -> bool {
            if self.unreachable.load(Ordering::SeqCst) {
                return false;
            }
            self.entries.remove(key).is_some()
        }

        async fn exists(&self, key: &str) -> bool {
            if self.unreachable.load(Ordering::SeqCst) {
                return false;
            }
            self.entries.contains_key(key)
        }

        async fn clear(&self) {
            self.entries.clear();
        }

        fn stats(&self) -> CacheStats {
            CacheStats {
                size: self.entries.len(),
                ..Default::default()
            }
        }

        fn name(&self) -> &'static str {
            "stub-remote"
        }
    }

    fn record(id: &str) -> FlightRecord {
        let mut r = FlightRecord::new(id);
        r.latitude = 40.6;
        r.longitude = -73.8;
        r
    }

    fn tiers() -> (Arc<LocalCache>, Arc<StubRemote>, TieredCache) {
        let local = Arc::new(LocalCache::with_defaults());
        let remote = Arc::new(StubRemote::default());
        let tiered = TieredCache::new(
            Arc::clone(&local) as Arc<dyn FlightCache>,
            Arc::clone(&remote) as Arc<dyn FlightCache>,
        );
        (local, remote, tiered)
    }

    /// Wait for the fire-and-forget backfill task to land.
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn test_local_hit_satisfies_read_even_with_remote_down() {
        let (_, remote, tiered) = tiers();

        tiered.put("AA123", record("aa123")).await.unwrap();
        remote.set_unreachable(true);

        let found = tiered.get("AA123").await;
        assert_eq!(found.unwrap().flight_id, "aa123");
    }

    #[tokio::test]
    async fn test_write_through_reaches_both_tiers() {
        let (local, remote, tiered) = tiers();

        tiered.put("UA456", record("ua456")).await.unwrap();

        assert!(local.get("UA456").await.is_some());
        assert!(remote.get("UA456").await.is_some());
    }

    #[tokio::test]
    async fn test_remote_hit_backfills_local() {
        let (_, remote, tiered) = tiers();

        // Populated by "another instance": present remotely, absent locally.
        remote.put("BA900", record("ba900")).await.unwrap();

        let found = tiered.get("BA900").await;
        assert_eq!(found.unwrap().flight_id, "ba900");

        settle().await;
        remote.set_unreachable(true);

        // Still answerable: the backfill populated the local tier.
        let found = tiered.get("BA900").await;
        assert_eq!(found.unwrap().flight_id, "ba900");
    }

    #[tokio::test]
    async fn test_double_miss_returns_absent() {
        let (_, _, tiered) = tiers();
        assert!(tiered.get("NOPE").await.is_none());
    }

    #[tokio::test]
    async fn test_remote_put_failure_does_not_fail_call() {
        let (local, remote, tiered) = tiers();
        remote.fail_puts_loudly.store(true, Ordering::SeqCst);

        tiered
            .put("AA123", record("aa123"))
            .await
            .expect("remote put failure must be swallowed");
        assert!(local.get("AA123").await.is_some());
    }

    #[tokio::test]
    async fn test_graceful_degradation_with_remote_down() {
        let (_, remote, tiered) = tiers();
        remote.set_unreachable(true);

        assert!(tiered.get("AA123").await.is_none());
        assert!(!tiered.exists("AA123").await);
        assert!(!tiered.delete("AA123").await);
        tiered.put("AA123", record("aa123")).await.unwrap();
        // Local tier still serves the read.
        assert!(tiered.get("AA123").await.is_some());
    }

    #[tokio::test]
    async fn test_delete_true_if_entry_in_either_tier() {
        let (_, remote, tiered) = tiers();

        // Only in the remote tier.
        remote.put("LH100", record("lh100")).await.unwrap();
        assert!(tiered.delete("LH100").await);
        assert!(!tiered.delete("LH100").await);

        // Only in the local tier.
        let local_only = record("af200");
        tiered.put("AF200", local_only).await.unwrap();
        remote.delete("AF200").await;
        assert!(tiered.delete("AF200").await);
        assert!(!tiered.delete("AF200").await);
    }

    #[tokio::test]
    async fn test_exists_checks_local_before_remote() {
        let (local, remote, tiered) = tiers();

        local.put("AA123", record("aa123")).await.unwrap();
        remote.set_unreachable(true);
        assert!(tiered.exists("AA123").await);

        remote.set_unreachable(false);
        remote.put("UA456", record("ua456")).await.unwrap();
        assert!(tiered.exists("UA456").await);

        assert!(!tiered.exists("ZZ999").await);
    }

    #[tokio::test]
    async fn test_clear_empties_both_tiers() {
        let (local, remote, tiered) = tiers();
        tiered.put("AA123", record("aa123")).await.unwrap();

        tiered.clear().await;

        assert!(local.get("AA123").await.is_none());
        assert!(remote.get("AA123").await.is_none());
    }

    #[tokio::test]
    async fn test_ttl_expiry_end_to_end_with_remote_down() {
        // TTL compressed from minutes to millis to keep the test fast; the
        // behavior under test is identical.
        let local = Arc::new(LocalCache::new(LocalCacheConfig {
            max_size: 100,
            ttl: Duration::from_millis(50),
        }));
        let remote = Arc::new(StubRemote::default());
        remote.set_unreachable(true);
        let tiered = TieredCache::new(
            local as Arc<dyn FlightCache>,
            remote as Arc<dyn FlightCache>,
        );

        tiered.put("AA123", record("aa123")).await.unwrap();
        assert_eq!(tiered.get("AA123").await.unwrap().flight_id, "aa123");

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(tiered.get("AA123").await.is_none());
    }
}
