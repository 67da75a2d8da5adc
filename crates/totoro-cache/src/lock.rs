//! Distributed task lock.
//!
//! Serializes non-idempotent background tasks across service instances. A
//! lock is a store entry `lock:<name>` holding caller-supplied data with a TTL
//! in minutes; its presence is the only signal that the task is running.
//!
//! Acquisition is a single atomic set-if-absent on the store, so two instances
//! can never both observe "free" and both take the lock. Contention is
//! reported, not retried: the caller gets [`LockError::Locked`] with the
//! remaining TTL and decides whether to wait or give up.
//!
//! # Example
//!
//! ```ignore
//! use totoro_cache::{DistributedLock, LockError};
//!
//! match lock.acquire("invoice-run", "worker-3", Some(10)).await {
//!     Ok(()) => {
//!         run_invoices().await;
//!         lock.release("invoice-run").await?;
//!     }
//!     Err(LockError::Locked { remaining, .. }) => {
//!         tracing::info!("invoice run busy for another {}s", remaining.as_secs());
//!     }
//!     Err(e) => return Err(e.into()),
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use totoro_config::{LockConfig, MAX_LOCK_TTL_MINUTES, lock_ttl};
use totoro_core::AppError;
use tracing::{error, info, instrument};

use crate::keys;
use crate::store::{SharedStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another holder owns the lock.
    #[error("Task is currently locked. Please wait {} seconds.", remaining.as_secs())]
    Locked { name: String, remaining: Duration },

    #[error("Lock TTL of {minutes} minutes is out of range (max {MAX_LOCK_TTL_MINUTES})")]
    InvalidTtl { minutes: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LockError {
    /// Remaining lock lifetime when contended.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            LockError::Locked { remaining, .. } => Some(*remaining),
            LockError::InvalidTtl { .. } | LockError::Store(_) => None,
        }
    }
}

impl From<LockError> for AppError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Locked { remaining, .. } => {
                AppError::conflict(err).with_retry_after(remaining.as_secs())
            }
            LockError::InvalidTtl { .. } => AppError::bad_request(err),
            LockError::Store(_) => AppError::internal(err),
        }
    }
}

fn track(event: &'static str) {
    counter!("lock_events_total", "event" => event).increment(1);
}

/// Named locks over a [`SharedStore`].
#[derive(Clone)]
pub struct DistributedLock {
    store: Arc<dyn SharedStore>,
    default_ttl_minutes: u64,
}

impl std::fmt::Debug for DistributedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedLock")
            .field("default_ttl_minutes", &self.default_ttl_minutes)
            .finish_non_exhaustive()
    }
}

impl DistributedLock {
    pub fn new(store: Arc<dyn SharedStore>, config: &LockConfig) -> Self {
        Self {
            store,
            default_ttl_minutes: config.default_ttl_minutes,
        }
    }

    /// Takes the lock `name`, storing `data` for `ttl_minutes`.
    ///
    /// `None` (or `Some(0)`) uses the configured default TTL.
    ///
    /// # Errors
    ///
    /// - [`LockError::Locked`] if a live lock exists, with its remaining TTL
    /// - [`LockError::InvalidTtl`] if the TTL exceeds [`MAX_LOCK_TTL_MINUTES`]
    /// - [`LockError::Store`] if the store fails
    #[instrument(skip(self, data), fields(lock.key = %keys::lock(name)))]
    pub async fn acquire(
        &self,
        name: &str,
        data: &str,
        ttl_minutes: Option<u64>,
    ) -> Result<(), LockError> {
        let key = keys::lock(name);
        let minutes = ttl_minutes
            .filter(|m| *m > 0)
            .unwrap_or(self.default_ttl_minutes);
        let ttl = lock_ttl(minutes).ok_or_else(|| {
            error!(lock.key = %key, lock.ttl_minutes = minutes, "[Lock] TTL out of range");
            LockError::InvalidTtl { minutes }
        })?;

        info!(lock.key = %key, lock.ttl_minutes = minutes, "[Lock] Locking key");
        track("attempt");

        let created = self
            .store
            .set_if_absent_with_expiry(&key, data, ttl)
            .await
            .inspect_err(|e| error!(lock.key = %key, error = %e, "[Lock] Store failure"))?;

        if created {
            info!(lock.key = %key, lock.data = %data, "[Lock] Locked key");
            track("acquired");
            return Ok(());
        }

        // The holder may expire between the two calls; report zero then.
        let remaining = self.store.ttl(&key).await?.unwrap_or_default();

        info!(
            lock.key = %key,
            lock.remaining_secs = remaining.as_secs(),
            "[Lock] Key is already locked"
        );
        track("contended");

        Err(LockError::Locked {
            name: name.to_string(),
            remaining,
        })
    }

    /// Releases the lock `name`. Releasing a free lock is a no-op.
    #[instrument(skip(self), fields(lock.key = %keys::lock(name)))]
    pub async fn release(&self, name: &str) -> Result<(), LockError> {
        let key = keys::lock(name);

        info!(lock.key = %key, "[Lock] Releasing lock");
        self.store
            .delete(&key)
            .await
            .inspect_err(|e| error!(lock.key = %key, error = %e, "[Lock] Store failure"))?;
        track("released");

        Ok(())
    }

    /// Remaining lifetime of the lock `name`, `None` when it is free.
    pub async fn status(&self, name: &str) -> Result<Option<Duration>, LockError> {
        let key = keys::lock(name);

        if !self.store.exists(&key).await? {
            return Ok(None);
        }
        Ok(Some(self.store.ttl(&key).await?.unwrap_or_default()))
    }

    /// Runs `task` while holding the lock `name`, releasing it afterwards.
    ///
    /// The lock is released whatever the task returns; a failed release is
    /// reported as an error even though the task completed.
    pub async fn run_exclusive<F, T>(
        &self,
        name: &str,
        data: &str,
        ttl_minutes: Option<u64>,
        task: F,
    ) -> Result<T, LockError>
    where
        F: Future<Output = T>,
    {
        self.acquire(name, data, ttl_minutes).await?;
        let output = task.await;
        self.release(name).await?;
        Ok(output)
    }
}
