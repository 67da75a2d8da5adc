//! Store key layout.
//!
//! Session tokens are stored verbatim as their own liveness key; the login
//! service writes them and this crate only reads them. Lock entries live under
//! the `lock:` namespace.

const LOCK_PREFIX: &str = "lock";

/// Key of the lock entry guarding task `name`.
pub fn lock(name: &str) -> String {
    format!("{}:{}", LOCK_PREFIX, name)
}

/// Liveness key of a session token.
pub fn session(token: &str) -> &str {
    token
}
