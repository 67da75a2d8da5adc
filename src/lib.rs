//! # Totoro
//!
//! Session authentication, role policies and distributed task locks shared by
//! the Totoro backend services.
//!
//! ## Overview
//!
//! Requests carry a signed session token in a cookie. Before a request reaches
//! a handler:
//!
//! 1. the **auth gate** ([`middleware::auth`]) resolves configuration, decodes
//!    the token with a pinned algorithm, checks that the token is still live
//!    in the shared store, optionally refuses unverified users, and attaches
//!    the caller's identity ([`middleware::auth::AuthUser`]) to the request;
//! 2. zero or more **policies** ([`middleware::policy`]) run in order: minimum
//!    role by score, exact role, or the internal-caller secret.
//!
//! Background tasks that must not run twice at once use
//! [`totoro_cache::DistributedLock`], independently of the HTTP pipeline.
//!
//! ## Layout
//!
//! ```text
//! crates/
//! ├── totoro-core/     # Role model, AuthError / AppError
//! ├── totoro-config/   # AuthConfig, LockConfig (from environment)
//! ├── totoro-auth/     # Claims, TokenCodec
//! ├── totoro-cache/    # SharedStore, RedisStore, MemoryStore, DistributedLock
//! └── totoro-cli/      # Operator CLI (locks, sessions)
//! src/
//! ├── middleware/      # auth gate and policies
//! ├── logging.rs       # tracing setup and request logging
//! ├── metrics.rs       # Prometheus metrics
//! ├── router.rs        # reference router
//! └── state.rs         # injected dependencies
//! ```
//!
//! ## Roles
//!
//! | Role | Score |
//! |------|-------|
//! | banned | -1 |
//! | unverified | 0 |
//! | user | 1 |
//! | family | 2 |
//! | admin | 3 |
//! | owner | 100 |
//!
//! ## Environment Variables
//!
//! ```bash
//! SESSION_COOKIE_NAME=session
//! SECRET_KEY=change-me
//! COOKIE_ALGORITHM=HS256
//! INTERNAL_SECRET=service-to-service-secret
//! REQUIRE_VERIFIED=true
//! LOCK_TTL_MINUTES=2
//! REDIS_URL=redis://127.0.0.1:6379
//! ```

pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export workspace crates for convenience
pub use totoro_auth;
pub use totoro_cache;
pub use totoro_config;
pub use totoro_core;
