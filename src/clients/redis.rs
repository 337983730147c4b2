use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    mapping::cache::MappingCache,
    models::mapping::{CacheLookup, ConfigMap},
};

#[derive(Debug, Serialize, Deserialize)]
struct CachedConfig {
    value: ConfigMap,
    expires_at_ms: i64,
}

pub async fn connect(redis_url: &str) -> Result<MultiplexedConnection, Error> {
    info!("Connecting to Redis");

    let client =
        Client::open(redis_url).map_err(|e| anyhow!("Failed to create redis client: {}", e))?;

    let connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| anyhow!("Failed to connect to redis: {}", e))?;

    info!("Redis connection established");

    Ok(connection)
}

/// Redis-backed [`MappingCache`]. Entries carry their own deadline so a
/// stale read is reported as expired even before Redis evicts the key.
#[derive(Clone)]
pub struct RedisMappingCache {
    connection: MultiplexedConnection,
}

impl RedisMappingCache {
    pub fn new(connection: MultiplexedConnection) -> Self {
        Self { connection }
    }

    pub async fn connect(redis_url: &str) -> Result<Self, Error> {
        Ok(Self::new(connect(redis_url).await?))
    }

    fn cache_key(key: &str) -> String {
        format!("mapping:{}", key)
    }
}

#[async_trait]
impl MappingCache for RedisMappingCache {
    async fn get(&self, key: &str) -> Result<CacheLookup<ConfigMap>, Error> {
        let raw: Option<String> = self
            .connection
            .clone()
            .get(Self::cache_key(key))
            .await
            .map_err(|e| anyhow!("Failed to get cached mapping: {}", e))?;

        let Some(raw) = raw else {
            return Ok(CacheLookup::Miss);
        };

        let cached = match serde_json::from_str::<CachedConfig>(&raw) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(key, error = %e, "Discarding unreadable cached mapping");
                return Ok(CacheLookup::Miss);
            }
        };

        if Utc::now().timestamp_millis() >= cached.expires_at_ms {
            return Ok(CacheLookup::Expired);
        }

        Ok(CacheLookup::Hit(cached.value))
    }

    async fn put(&self, key: &str, value: ConfigMap, ttl: Duration) -> Result<(), Error> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let cached = CachedConfig {
            value,
            expires_at_ms: Utc::now().timestamp_millis().saturating_add(ttl_ms),
        };
        let payload = serde_json::to_string(&cached)?;
        let ttl_seconds = expiry_seconds(ttl);

        self.connection
            .clone()
            .set_ex::<_, _, ()>(Self::cache_key(key), payload, ttl_seconds)
            .await
            .map_err(|e| anyhow!("Failed to cache mapping: {}", e))?;

        Ok(())
    }
}

/// Whole-second key expiry for `SET EX`, rounded up so Redis never evicts
/// an entry before its stored deadline.
pub fn expiry_seconds(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis().div_ceil(1000))
        .unwrap_or(u64::MAX)
        .max(1)
}
