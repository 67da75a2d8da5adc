//! # Totoro Cache
//!
//! Shared key-value store access for Totoro services.
//!
//! This crate provides:
//! - [`SharedStore`]: the narrow store interface (exists, ttl, set with expiry,
//!   atomic set-if-absent, delete) every other component depends on
//! - [`RedisStore`]: the production implementation over a Redis connection manager
//! - [`MemoryStore`]: a single-process implementation for tests and local runs
//! - [`DistributedLock`]: named task locks with a TTL, built on the store
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use totoro_cache::{CacheConfig, DistributedLock, RedisStore, SharedStore};
//! use totoro_config::LockConfig;
//!
//! let config = CacheConfig::from_env();
//! let store: Arc<dyn SharedStore> = Arc::new(RedisStore::new(&config.redis_url).await?);
//! let lock = DistributedLock::new(store.clone(), &LockConfig::from_env());
//!
//! lock.acquire("nightly-sync", "worker-1", Some(5)).await?;
//! // ... run the task ...
//! lock.release("nightly-sync").await?;
//! ```

pub mod config;
pub mod keys;
pub mod lock;
pub mod memory;
pub mod redis;
pub mod store;

pub use config::CacheConfig;
pub use lock::{DistributedLock, LockError};
pub use memory::MemoryStore;
pub use self::redis::RedisStore;
pub use store::{SharedStore, StoreError};
