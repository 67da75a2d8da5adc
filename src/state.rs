use std::sync::Arc;

use anyhow::Context;
use totoro_cache::{CacheConfig, DistributedLock, RedisStore, SharedStore};
use totoro_config::{AuthConfig, LockConfig};

use crate::middleware::policy::{Policy, PolicyChain};

/// Dependencies shared by every request.
///
/// Cloned per request; holds only immutable configuration and `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SharedStore>,
    pub auth_config: AuthConfig,
    pub lock: DistributedLock,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("auth_config", &self.auth_config)
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        store: Arc<dyn SharedStore>,
        auth_config: AuthConfig,
        lock_config: &LockConfig,
    ) -> Self {
        Self {
            lock: DistributedLock::new(store.clone(), lock_config),
            store,
            auth_config,
        }
    }

    /// Builds an ordered policy chain bound to this state's configuration.
    pub fn policies(&self, policies: impl IntoIterator<Item = Policy>) -> PolicyChain {
        PolicyChain::new(self.auth_config.clone(), policies)
    }
}

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let cache_config = CacheConfig::from_env();
    let store = RedisStore::new(&cache_config.redis_url)
        .await
        .context("Failed to connect to Redis")?;
    store.ping().await.context("Redis did not answer PING")?;

    Ok(AppState::new(
        Arc::new(store),
        AuthConfig::from_env(),
        &LockConfig::from_env(),
    ))
}
