//! Middleware and extractors for authentication and authorization.
//!
//! # Modules
//!
//! - [`auth`]: the auth gate and the [`auth::AuthUser`] identity context
//! - [`policy`]: role and internal-caller policies, composed per route
//!
//! # Request Flow
//!
//! 1. Client sends the session token in the configured cookie
//! 2. [`auth::auth_gate`] verifies it and stores [`auth::AuthUser`] in the request extensions
//! 3. [`policy::enforce`] runs the route's [`policy::PolicyChain`]
//! 4. Handler executes if all checks pass
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware, routing::get};
//! use totoro::middleware::{auth::auth_gate, policy::{Policy, enforce}};
//! use totoro_core::Role;
//!
//! let family_only = state.policies([Policy::MinRole(Role::Family)]);
//!
//! let routes = Router::new()
//!     .route("/premium", get(premium_handler))
//!     .route_layer(middleware::from_fn_with_state(family_only, enforce))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), auth_gate));
//! ```
//!
//! Layers added later run first, so the gate is always added last.

pub mod auth;
pub mod policy;
