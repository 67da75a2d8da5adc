//! The shared store interface.
//!
//! Both the authentication gate (session liveness) and the distributed lock
//! talk to the shared store through [`SharedStore`] only. The concrete client
//! is built once at startup and injected as an `Arc<dyn SharedStore>`.

use std::time::Duration;

use async_trait::async_trait;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] ::redis::RedisError),

    #[error("Store error: {0}")]
    Other(String),
}

/// Narrow key-value capability shared across service instances.
///
/// Implementations must be safe for concurrent use from many tasks and
/// processes. [`SharedStore::set_if_absent_with_expiry`] must be a single
/// atomic operation on the backing store.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Whether `key` currently exists.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Remaining time-to-live of `key`.
    ///
    /// `None` if the key is absent or has no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    /// Writes `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration)
    -> Result<(), StoreError>;

    /// Writes `value` under `key` only if `key` is absent, expiring after `ttl`.
    ///
    /// Returns `true` if this call created the key.
    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Deletes `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
