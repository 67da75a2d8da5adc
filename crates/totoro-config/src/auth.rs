use std::env;

pub const SESSION_COOKIE_NAME: &str = "SESSION_COOKIE_NAME";
pub const SECRET_KEY: &str = "SECRET_KEY";
pub const COOKIE_ALGORITHM: &str = "COOKIE_ALGORITHM";
pub const INTERNAL_SECRET: &str = "INTERNAL_SECRET";
pub const REQUIRE_VERIFIED: &str = "REQUIRE_VERIFIED";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not set. Set that in .env file or in the environment")]
    Missing(&'static str),
}

impl ConfigError {
    /// Name of the environment variable at fault.
    pub fn setting(&self) -> &'static str {
        match self {
            ConfigError::Missing(name) => name,
        }
    }
}

/// Authentication settings.
///
/// # Environment Variables
///
/// - `SESSION_COOKIE_NAME`: cookie carrying the session token
/// - `SECRET_KEY`: symmetric signing secret
/// - `COOKIE_ALGORITHM`: signing algorithm (`HS256`, `HS384`, `HS512`)
/// - `INTERNAL_SECRET`: pre-shared secret for service-to-service calls
/// - `REQUIRE_VERIFIED`: reject `unverified` users at the gate (default: `true`)
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    pub cookie_name: Option<String>,
    pub secret: Option<String>,
    pub algorithm: Option<String>,
    pub internal_secret: Option<String>,
    pub require_verified: bool,
}

/// Settings the gate needs on every request, all present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAuth {
    pub cookie_name: String,
    pub secret: String,
    pub algorithm: String,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            cookie_name: non_empty_var(SESSION_COOKIE_NAME),
            secret: non_empty_var(SECRET_KEY),
            algorithm: non_empty_var(COOKIE_ALGORITHM),
            internal_secret: non_empty_var(INTERNAL_SECRET),
            require_verified: env::var(REQUIRE_VERIFIED)
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        }
    }

    /// Resolves the settings required by the gate, in the order the gate needs them.
    pub fn resolve(&self) -> Result<ResolvedAuth, ConfigError> {
        let cookie_name = self
            .cookie_name
            .clone()
            .ok_or(ConfigError::Missing(SESSION_COOKIE_NAME))?;
        let algorithm = self
            .algorithm
            .clone()
            .ok_or(ConfigError::Missing(COOKIE_ALGORITHM))?;
        let secret = self
            .secret
            .clone()
            .ok_or(ConfigError::Missing(SECRET_KEY))?;

        Ok(ResolvedAuth {
            cookie_name,
            secret,
            algorithm,
        })
    }

    pub fn internal_secret(&self) -> Result<&str, ConfigError> {
        self.internal_secret
            .as_deref()
            .ok_or(ConfigError::Missing(INTERNAL_SECRET))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> AuthConfig {
        AuthConfig {
            cookie_name: Some("session_cookie".to_string()),
            secret: Some("secret_key".to_string()),
            algorithm: Some("HS256".to_string()),
            internal_secret: Some("internal".to_string()),
            require_verified: true,
        }
    }

    #[test]
    fn test_resolve_complete_config() {
        let resolved = full_config().resolve().unwrap();
        assert_eq!(resolved.cookie_name, "session_cookie");
        assert_eq!(resolved.secret, "secret_key");
        assert_eq!(resolved.algorithm, "HS256");
    }

    #[test]
    fn test_resolve_reports_first_missing_setting() {
        let mut config = full_config();
        config.cookie_name = None;
        config.secret = None;
        assert_eq!(
            config.resolve(),
            Err(ConfigError::Missing(SESSION_COOKIE_NAME))
        );

        let mut config = full_config();
        config.secret = None;
        assert_eq!(config.resolve().unwrap_err().setting(), SECRET_KEY);

        let mut config = full_config();
        config.algorithm = None;
        assert_eq!(config.resolve().unwrap_err().setting(), COOKIE_ALGORITHM);
    }

    #[test]
    fn test_internal_secret_missing() {
        let config = AuthConfig::default();
        assert_eq!(
            config.internal_secret(),
            Err(ConfigError::Missing(INTERNAL_SECRET))
        );
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("OFF"));
        assert!(!parse_flag(" 0 "));
    }
}
