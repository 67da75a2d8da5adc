//! Redis implementation of [`SharedStore`].

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, instrument};

use crate::store::{SharedStore, StoreError};

/// Redis store client over a reconnecting connection manager.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to Redis.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if connection fails.
    pub async fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self { conn })
    }

    /// Round-trips a `PING`.
    #[instrument(skip(self), fields(store.operation = "PING"))]
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Redis expiries are whole seconds and must be positive.
fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl SharedStore for RedisStore {
    #[instrument(skip(self), fields(store.operation = "EXISTS"))]
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    #[instrument(skip(self), fields(store.operation = "TTL"))]
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut conn = self.conn.clone();

        // -1 (no expiry) or -2 (doesn't exist)
        let ttl: i64 = conn.ttl(key).await?;
        Ok(u64::try_from(ttl).ok().map(Duration::from_secs))
    }

    #[instrument(skip(self, value), fields(store.operation = "SETEX"))]
    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let secs = expiry_secs(ttl);

        conn.set_ex::<_, _, ()>(key, value, secs).await?;

        debug!(store.key = %key, store.ttl_secs = %secs, "Key set");
        Ok(())
    }

    #[instrument(skip(self, value), fields(store.operation = "SET_NX_EX"))]
    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let secs = expiry_secs(ttl);

        // nil reply means the key already existed
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(secs)
            .query_async(&mut conn)
            .await?;

        debug!(store.key = %key, store.created = reply.is_some(), "Conditional set");
        Ok(reply.is_some())
    }

    #[instrument(skip(self), fields(store.operation = "DEL"))]
    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();

        conn.del::<_, ()>(key).await?;

        debug!(store.key = %key, "Key deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration tests require a running Redis instance

    #[test]
    fn test_expiry_secs_never_zero() {
        assert_eq!(expiry_secs(Duration::from_millis(200)), 1);
        assert_eq!(expiry_secs(Duration::from_secs(120)), 120);
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_set_if_absent_is_exclusive() {
        let store = RedisStore::new("redis://localhost:6379").await.unwrap();
        store.delete("test:nx").await.unwrap();

        assert!(
            store
                .set_if_absent_with_expiry("test:nx", "a", Duration::from_secs(60))
                .await
                .unwrap()
        );
        assert!(
            !store
                .set_if_absent_with_expiry("test:nx", "b", Duration::from_secs(60))
                .await
                .unwrap()
        );

        let ttl = store.ttl("test:nx").await.unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(60));

        store.delete("test:nx").await.unwrap();
        assert!(!store.exists("test:nx").await.unwrap());
    }
}
