//! User roles and their ordering.
//!
//! Every role carries a fixed integer score. Comparisons between roles (and
//! minimum-role policies) are decided by that score alone:
//!
//! | Role | Score |
//! |------|-------|
//! | `banned` | -1 |
//! | `unverified` | 0 |
//! | `user` | 1 |
//! | `family` | 2 |
//! | `admin` | 3 |
//! | `owner` | 100 |
//!
//! Role values arriving from tokens are untrusted strings. [`score_of`] maps
//! anything outside the table (or no role at all) to score `0`, so a policy
//! evaluated against a garbage role denies instead of failing.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Score given to a role value that is missing or not part of [`Role`].
pub const UNKNOWN_ROLE_SCORE: i32 = 0;

/// Access tier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Explicitly revoked access.
    Banned,
    /// Identity known, not yet verified.
    Unverified,
    /// Verified base tier.
    User,
    /// Verified and subscribed.
    Family,
    /// Operator, one level below owner.
    Admin,
    /// Unrestricted super-user.
    Owner,
}

impl Role {
    /// Numeric score used for ordering.
    pub const fn score(self) -> i32 {
        match self {
            Role::Banned => -1,
            Role::Unverified => 0,
            Role::User => 1,
            Role::Family => 2,
            Role::Admin => 3,
            Role::Owner => 100,
        }
    }

    /// Wire value of the role, as carried in tokens.
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Banned => "banned",
            Role::Unverified => "unverified",
            Role::User => "user",
            Role::Family => "family",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// All roles, highest tier first.
    pub const fn all() -> [Role; 6] {
        [
            Role::Owner,
            Role::Admin,
            Role::Family,
            Role::User,
            Role::Unverified,
            Role::Banned,
        ]
    }

    /// Returns `true` if this role is at least as privileged as `other`.
    pub fn at_least(self, other: Role) -> bool {
        self.score() >= other.score()
    }
}

/// Score of a raw role value.
///
/// Unknown values and `None` score [`UNKNOWN_ROLE_SCORE`].
pub fn score_of(role: Option<&str>) -> i32 {
    role.and_then(|r| r.parse::<Role>().ok())
        .map(Role::score)
        .unwrap_or(UNKNOWN_ROLE_SCORE)
}

/// Error returned when a string is not an exact role value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "banned" => Ok(Role::Banned),
            "unverified" => Ok(Role::Unverified),
            "user" => Ok(Role::User),
            "family" => Ok(Role::Family),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score().cmp(&other.score())
    }
}
