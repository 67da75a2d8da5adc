//! # Totoro Core
//!
//! Core types shared by every Totoro service:
//!
//! - [`roles`]: the closed, score-ordered set of user roles
//! - [`errors`]: the authentication error taxonomy and its HTTP mapping
//!
//! # Example
//!
//! ```ignore
//! use totoro_core::{AuthError, Role};
//!
//! let role: Role = "family".parse()?;
//! assert!(role >= Role::User);
//!
//! let denied = AuthError::Forbidden;
//! assert_eq!(denied.status_code().as_u16(), 403);
//! ```

pub mod errors;
pub mod roles;

// Re-export commonly used types at crate root
pub use errors::{AppError, AuthError};
pub use roles::{Role, UnknownRole, score_of};
