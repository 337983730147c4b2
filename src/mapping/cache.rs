use std::time::{Duration, Instant};

use anyhow::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::mapping::{CacheLookup, ConfigMap};

pub const NOTIFICATION_MAPPING_SUFFIX: &str = "NOTIFICATION_MAPPING";

pub fn mapping_cache_key(service_name: &str, vehicle_id: &str) -> String {
    format!(
        "{}_{}_{}",
        service_name, vehicle_id, NOTIFICATION_MAPPING_SUFFIX
    )
}

/// Shared store for per-vehicle configuration documents. Expiry is lazy:
/// an entry past its TTL reads as `Expired` and is never served.
#[async_trait]
pub trait MappingCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<CacheLookup<ConfigMap>, Error>;

    async fn put(&self, key: &str, value: ConfigMap, ttl: Duration) -> Result<(), Error>;
}

struct TtlEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> TtlEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// In-process TTL cache. Sharded, so writers for different keys never
/// contend on a single lock.
pub struct TtlCache<V> {
    entries: DashMap<String, TtlEntry<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn lookup(&self, key: &str) -> CacheLookup<V> {
        let now = Instant::now();

        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => CacheLookup::Expired,
            Some(entry) => CacheLookup::Hit(entry.value.clone()),
            None => CacheLookup::Miss,
        }
    }

    pub fn insert(&self, key: &str, value: V, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            TtlEntry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drops expired entries.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MappingCache for TtlCache<ConfigMap> {
    async fn get(&self, key: &str) -> Result<CacheLookup<ConfigMap>, Error> {
        Ok(self.lookup(key))
    }

    async fn put(&self, key: &str, value: ConfigMap, ttl: Duration) -> Result<(), Error> {
        self.insert(key, value, ttl);
        Ok(())
    }
}
