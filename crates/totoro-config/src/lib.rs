//! # Totoro Config
//!
//! Configuration structures loaded from environment variables:
//!
//! - [`auth`]: session cookie, signing secret/algorithm, internal secret
//! - [`lock`]: distributed lock defaults
//!
//! Settings the gate cannot work without are kept optional here and resolved
//! per use, so a missing value surfaces as a server error on the request that
//! needs it instead of a panic at boot.
//!
//! # Example
//!
//! ```ignore
//! use totoro_config::{AuthConfig, LockConfig};
//!
//! let auth_config = AuthConfig::from_env();
//! let resolved = auth_config.resolve()?;
//! let lock_config = LockConfig::from_env();
//! ```

pub mod auth;
pub mod lock;

// Re-export commonly used types at crate root
pub use auth::{AuthConfig, ConfigError, ResolvedAuth};
pub use lock::{LockConfig, MAX_LOCK_TTL_MINUTES, lock_ttl};
