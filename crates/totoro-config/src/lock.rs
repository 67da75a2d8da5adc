use std::env;
use std::time::Duration;

/// Default lock lifetime when neither the caller nor the environment sets one.
pub const DEFAULT_LOCK_TTL_MINUTES: u64 = 2;

/// Longest lock lifetime accepted, 30 days.
pub const MAX_LOCK_TTL_MINUTES: u64 = 30 * 24 * 60;

/// Converts a lock lifetime in minutes, `None` when above [`MAX_LOCK_TTL_MINUTES`].
pub fn lock_ttl(minutes: u64) -> Option<Duration> {
    if minutes > MAX_LOCK_TTL_MINUTES {
        return None;
    }
    minutes.checked_mul(60).map(Duration::from_secs)
}

/// Distributed lock settings.
///
/// # Environment Variables
///
/// - `LOCK_TTL_MINUTES`: TTL applied when `acquire` gets no explicit TTL (default: `2`)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockConfig {
    pub default_ttl_minutes: u64,
}

impl LockConfig {
    pub fn from_env() -> Self {
        Self {
            default_ttl_minutes: env::var("LOCK_TTL_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|m| (1..=MAX_LOCK_TTL_MINUTES).contains(m))
                .unwrap_or(DEFAULT_LOCK_TTL_MINUTES),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_minutes.min(MAX_LOCK_TTL_MINUTES) * 60)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_ttl_minutes: DEFAULT_LOCK_TTL_MINUTES,
        }
    }
}
