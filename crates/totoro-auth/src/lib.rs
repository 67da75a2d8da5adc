//! # Totoro Auth
//!
//! Session token types and signing utilities.
//!
//! - [`claims`]: the identity payload carried by session tokens
//! - [`jwt`]: the token codec (encode, decode, algorithm pinning)
//!
//! Tokens are issued by the login flow of another service; this crate only
//! needs to read them. Encoding is provided for that flow and for tests.
//!
//! # Example
//!
//! ```ignore
//! use totoro_auth::{Claims, TokenCodec, UserId};
//! use totoro_core::Role;
//!
//! let codec = TokenCodec::new("secret", "HS256")?;
//! let token = codec.encode(&Claims::new(UserId::Number(1), Role::User))?;
//! let claims = codec.decode(&token)?;
//! assert_eq!(claims.role(), Some(Role::User));
//! ```

pub mod claims;
pub mod jwt;

// Re-export commonly used types at crate root
pub use claims::{Claims, UserId};
pub use jwt::{TokenCodec, TokenError, decode_token, encode_token};
