//! Session token codec.
//!
//! Tokens are HMAC-signed JWTs. The algorithm always comes from configuration
//! and is pinned in the [`Validation`]: a token whose header names any other
//! algorithm is refused before its signature is even considered. `none` and
//! asymmetric algorithm names are refused when the codec is built, since the
//! signing material is a shared secret.
//!
//! Decoding failures are classified ([`TokenError`]) so callers can log the
//! precise reason, but they are meant to collapse into a single public
//! "invalid token" outcome.
//!
//! # Example
//!
//! ```ignore
//! use totoro_auth::{decode_token, encode_token, Claims};
//! use totoro_core::Role;
//!
//! let token = encode_token(&Claims::new(1, Role::User), "secret", "HS256")?;
//! let claims = decode_token(&token, "secret", "HS256")?;
//! ```

use std::fmt;
use std::str::FromStr;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::claims::Claims;

/// Why a token could not be produced or accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature does not match")]
    InvalidSignature,

    #[error("token is malformed")]
    Malformed,

    #[error("token algorithm is not allowed")]
    DisallowedAlgorithm,

    #[error("token has expired")]
    Expired,

    #[error("signing key is invalid")]
    InvalidKey,

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("failed to encode token: {0}")]
    Encoding(String),
}

impl TokenError {
    /// Stable label, used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::InvalidSignature => "invalid_signature",
            TokenError::Malformed => "malformed",
            TokenError::DisallowedAlgorithm => "disallowed_algorithm",
            TokenError::Expired => "expired",
            TokenError::InvalidKey => "invalid_key",
            TokenError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            TokenError::Encoding(_) => "encoding",
        }
    }
}

impl From<JwtError> for TokenError {
    fn from(err: JwtError) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::DisallowedAlgorithm
            }
            ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => TokenError::Expired,
            ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::MissingAlgorithm => TokenError::InvalidKey,
            _ => TokenError::Malformed,
        }
    }
}

/// Parses a configured algorithm name, accepting only the HMAC family.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, TokenError> {
    let algorithm = Algorithm::from_str(name.trim())
        .map_err(|_| TokenError::UnsupportedAlgorithm(name.to_string()))?;

    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        _ => Err(TokenError::UnsupportedAlgorithm(name.to_string())),
    }
}

/// Encoder/decoder bound to one secret and one pinned algorithm.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Builds a codec for `secret` and the algorithm named `algorithm`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InvalidKey`] if the secret is empty
    /// - [`TokenError::UnsupportedAlgorithm`] for `none`, unknown or non-HMAC names
    pub fn new(secret: &str, algorithm: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::InvalidKey);
        }
        let algorithm = parse_algorithm(algorithm)?;

        let mut validation = Validation::new(algorithm);
        // exp is honoured when present but not required, to the second.
        validation.required_spec_claims.clear();
        validation.leeway = 0;
        validation.validate_aud = false;

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Signs `claims` into a compact token.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verifies signature, pinned algorithm and expiry, then returns the claims.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::from)
    }
}

/// One-shot encode with an explicit secret and algorithm.
pub fn encode_token(claims: &Claims, secret: &str, algorithm: &str) -> Result<String, TokenError> {
    TokenCodec::new(secret, algorithm)?.encode(claims)
}

/// One-shot decode with an explicit secret and algorithm.
pub fn decode_token(token: &str, secret: &str, algorithm: &str) -> Result<Claims, TokenError> {
    TokenCodec::new(secret, algorithm)?.decode(token)
}
