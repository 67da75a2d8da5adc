//! Identity claims carried by session tokens.
//!
//! The payload keeps the field names used across Totoro services:
//!
//! - `user`: user id, numeric or string
//! - `user_role`: role wire value (kept raw, see [`Claims::role`])
//! - `iat` / `exp`: optional issued-at and expiry timestamps
//!
//! Any other field is preserved in [`Claims::extra`].

use std::fmt;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use totoro_core::{Role, score_of};

/// User identifier as found in the token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(id) => write!(f, "{}", id),
            UserId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId::Number(id)
    }
}

impl From<i32> for UserId {
    fn from(id: i32) -> Self {
        UserId::Number(i64::from(id))
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId::Text(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        UserId::Text(id)
    }
}

/// Session token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub user: UserId,
    /// Raw role value; unknown values are kept as-is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Every other payload field
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn new(user: impl Into<UserId>, role: Role) -> Self {
        Self {
            user: user.into(),
            user_role: Some(role.as_str().to_string()),
            iat: None,
            exp: None,
            extra: Map::new(),
        }
    }

    /// Claims with a raw (possibly unknown or absent) role value.
    pub fn with_raw_role(user: impl Into<UserId>, role: Option<&str>) -> Self {
        Self {
            user: user.into(),
            user_role: role.map(str::to_string),
            iat: None,
            exp: None,
            extra: Map::new(),
        }
    }

    /// Stamps `iat` with the current time and `exp` with `now + ttl`.
    pub fn expires_in(mut self, ttl: Duration) -> Self {
        let now = Utc::now().timestamp();
        self.iat = Some(now);
        self.exp = Some(now + ttl.num_seconds());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Parsed role, `None` when absent or not an exact role value.
    pub fn role(&self) -> Option<Role> {
        self.user_role.as_deref().and_then(|r| r.parse().ok())
    }

    /// Role score, `0` for unknown or missing roles.
    pub fn role_score(&self) -> i32 {
        score_of(self.user_role.as_deref())
    }
}
