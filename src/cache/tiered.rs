//! Cache-aside orchestration over the volatile and durable tiers.
//!
//! Reads go volatile → durable; a durable hit is copied back into the
//! volatile tier so the two tiers hold byte-identical payloads. Writes go
//! durable → volatile, and a failed durable write leaves the volatile tier
//! untouched.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::{CacheKey, DurableStore, VolatileStore};
use crate::telemetry;
use crate::{FinmemoError, Result};

/// Which tier answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Volatile,
    Durable,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Volatile => "volatile",
            Tier::Durable => "durable",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-tier cache-aside store.
///
/// Both stores are shared, long-lived handles; no locking happens here.
#[derive(Clone)]
pub struct TieredCache {
    volatile: Arc<dyn VolatileStore>,
    durable: Arc<dyn DurableStore>,
}

impl TieredCache {
    pub fn new(volatile: Arc<dyn VolatileStore>, durable: Arc<dyn DurableStore>) -> Self {
        Self { volatile, durable }
    }

    /// Look up the payload for `key`.
    ///
    /// `Ok(None)` is the normal "compute it" signal, not an error.
    pub async fn lookup(&self, key: &CacheKey) -> Result<Option<String>> {
        Ok(self.lookup_tiered(key).await?.map(|(value, _)| value))
    }

    /// Like [`lookup`](Self::lookup), also reporting which tier answered.
    ///
    /// A tier that is [`StoreUnavailable`](FinmemoError::StoreUnavailable)
    /// counts as a miss as long as the other tier answered. Only when both
    /// are unavailable does the lookup fail, with the durable tier's error.
    pub async fn lookup_tiered(&self, key: &CacheKey) -> Result<Option<(String, Tier)>> {
        let volatile_up = match self.volatile.get(key).await {
            Ok(Some(value)) => {
                debug!(key = %key, store = self.volatile.name(), "volatile hit");
                return Ok(Some((value, Tier::Volatile)));
            }
            Ok(None) => true,
            Err(e) => {
                metrics::counter!(telemetry::VOLATILE_FAILURES_TOTAL, "operation" => "get")
                    .increment(1);
                warn!(key = %key, error = %e, "volatile tier unavailable, falling through to durable");
                false
            }
        };

        let found = match self.durable.get(key).await {
            Ok(found) => found,
            Err(e @ FinmemoError::StoreUnavailable { .. }) if volatile_up => {
                metrics::counter!(telemetry::DURABLE_FAILURES_TOTAL, "operation" => "get")
                    .increment(1);
                warn!(key = %key, error = %e, "durable tier unavailable, treating as miss");
                None
            }
            Err(e) => return Err(e),
        };
        let Some(value) = found else {
            debug!(key = %key, "miss in both tiers");
            return Ok(None);
        };

        debug!(key = %key, store = self.durable.name(), "durable hit, repopulating volatile");
        self.set_volatile(key, &value).await;
        Ok(Some((value, Tier::Durable)))
    }

    /// Write `value` through both tiers, durable first.
    ///
    /// A durable failure aborts with [`FinmemoError::CachePersist`] before
    /// the volatile tier is touched. A volatile failure after a successful
    /// durable write is logged only.
    ///
    /// Concurrent writers of one key are not ordered here: two of them can
    /// interleave as durable(A), durable(B), volatile(B), volatile(A) and
    /// leave the tiers disagreeing. [`Memoized`](super::Memoized) serializes
    /// its own writes per key; writers in other processes are last-write-wins
    /// in each tier.
    pub async fn write_through(&self, key: &CacheKey, value: &str) -> Result<()> {
        if let Err(e) = self.durable.upsert(key, value).await {
            error!(key = %key, store = self.durable.name(), error = %e, "durable write failed");
            return Err(FinmemoError::CachePersist {
                key: key.to_string(),
                message: e.to_string(),
            });
        }
        self.set_volatile(key, value).await;
        Ok(())
    }

    async fn set_volatile(&self, key: &CacheKey, value: &str) {
        if let Err(e) = self.volatile.set(key, value).await {
            metrics::counter!(telemetry::VOLATILE_FAILURES_TOTAL, "operation" => "set")
                .increment(1);
            warn!(key = %key, error = %e, "volatile write failed, durable copy remains authoritative");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryDurableStore, MemoryStore};

    fn key(s: &str) -> CacheKey {
        CacheKey::for_args("tiered", &(s,)).unwrap()
    }

    fn fixture() -> (TieredCache, Arc<MemoryStore>, Arc<MemoryDurableStore>) {
        let volatile = Arc::new(MemoryStore::new());
        let durable = Arc::new(MemoryDurableStore::new());
        let cache = TieredCache::new(volatile.clone(), durable.clone());
        (cache, volatile, durable)
    }

    #[tokio::test]
    async fn double_miss_is_none() {
        let (cache, _, _) = fixture();
        assert_eq!(cache.lookup(&key("k")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn volatile_hit_reports_tier() {
        let (cache, volatile, _) = fixture();
        volatile.set(&key("k"), "v").await.unwrap();

        let hit = cache.lookup_tiered(&key("k")).await.unwrap();
        assert_eq!(hit, Some(("v".to_string(), Tier::Volatile)));
    }

    #[tokio::test]
    async fn durable_hit_repopulates_volatile() {
        let (cache, volatile, durable) = fixture();
        durable.upsert(&key("k"), r#"{"a":1}"#).await.unwrap();

        let hit = cache.lookup_tiered(&key("k")).await.unwrap();
        assert_eq!(hit, Some((r#"{"a":1}"#.to_string(), Tier::Durable)));
        assert_eq!(
            volatile.get(&key("k")).await.unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );
    }

    #[tokio::test]
    async fn write_through_fills_both_tiers() {
        let (cache, volatile, durable) = fixture();
        cache.write_through(&key("k"), "payload").await.unwrap();

        assert_eq!(
            durable.get(&key("k")).await.unwrap().as_deref(),
            Some("payload")
        );
        assert_eq!(
            volatile.get(&key("k")).await.unwrap().as_deref(),
            Some("payload")
        );
    }

    struct Down;

    #[async_trait::async_trait]
    impl DurableStore for Down {
        fn name(&self) -> &str {
            "down"
        }

        async fn get(&self, _key: &CacheKey) -> Result<Option<String>> {
            Err(FinmemoError::unavailable("durable", "connection refused"))
        }

        async fn upsert(&self, _key: &CacheKey, _value: &str) -> Result<()> {
            Err(FinmemoError::unavailable("durable", "connection refused"))
        }
    }

    #[tokio::test]
    async fn durable_outage_behind_healthy_volatile_is_a_miss() {
        let volatile = Arc::new(MemoryStore::new());
        let cache = TieredCache::new(volatile.clone(), Arc::new(Down));
        assert_eq!(cache.lookup(&key("k")).await.unwrap(), None);

        volatile.set(&key("k"), "v").await.unwrap();
        assert_eq!(cache.lookup(&key("k")).await.unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn tier_labels() {
        assert_eq!(Tier::Volatile.to_string(), "volatile");
        assert_eq!(Tier::Durable.as_str(), "durable");
    }
}
