//! Read-through cache over Redis.
//!
//! The cache is a best-effort accelerator, never the system of record.
//! Callers log failures and carry on; nothing here is allowed to fail a
//! governing operation.

use std::time::Duration;

use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::CacheResult;

/// Default entry TTL, mirroring the listing/detail cache expiry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Cache key for the full auction listing.
pub fn all_auctions_key() -> &'static str {
    "auctions:all"
}

/// Cache key for a single auction.
pub fn auction_key(auction_id: &str) -> String {
    format!("auction:{}", auction_id)
}

/// Cache store configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub redis_url: String,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            ttl: DEFAULT_TTL,
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            ttl: Duration::from_secs(
                std::env::var("CACHE_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}

/// JSON-serialized key-value cache with TTL.
#[derive(Clone)]
pub struct CacheStore {
    client: redis::Client,
    config: CacheConfig,
}

impl CacheStore {
    pub fn new(config: CacheConfig) -> CacheResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> CacheResult<Self> {
        Self::new(CacheConfig::from_env())
    }

    /// Fetch and deserialize an entry. A parse failure reads as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(json) => match serde_json::from_str(&json) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    debug!(key = %key, "Discarding unparseable cache entry: {}", e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Store an entry with the configured TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> CacheResult<()> {
        self.set_with_ttl(key, value, self.config.ttl).await
    }

    /// Store an entry with an explicit TTL.
    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(value)?;
        conn.set_ex::<_, _, ()>(key, json, ttl.as_secs()).await?;
        Ok(())
    }

    /// Delete an entry. Missing keys are fine.
    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    /// SET NX EX marker. Returns true when this caller placed the marker,
    /// false when it already existed. Backs notification de-duplication.
    pub async fn set_if_absent(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let placed: bool = redis::cmd("SET")
            .arg(key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async::<Option<String>>(&mut conn)
            .await?
            .is_some();
        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_builders() {
        assert_eq!(all_auctions_key(), "auctions:all");
        assert_eq!(auction_key("abc"), "auction:abc");
    }

    #[test]
    fn config_default_ttl() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(600));
    }
}
