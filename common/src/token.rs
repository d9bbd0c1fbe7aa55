// common/src/token.rs
//! Signed bearer tokens.
//!
//! Tokens are HS256 JWTs carrying `sub` (identity handle), `roles`, `iat`
//! and `exp`. Expiry is checked here rather than by `jsonwebtoken` so the
//! boundary is exact: a token is valid while `now < exp` and never after,
//! with no leeway. Time is kept at second precision.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::config::AuthConfig;
use crate::models::{Principal, Role};

/// Scheme prefix of the `Authorization` value, on HTTP and on frames
pub const BEARER_PREFIX: &str = "Bearer ";

/// Shortest accepted HMAC key, in bytes
pub const MIN_KEY_LEN: usize = 32;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is empty")]
    Empty,

    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("unsupported signing algorithm")]
    UnsupportedAlgorithm,

    #[error("token expired")]
    Expired,

    #[error("no signing key configured")]
    MissingKey,

    #[error("signing key must be at least {MIN_KEY_LEN} bytes")]
    WeakKey,

    #[error("signing key is not valid base64")]
    KeyEncoding,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Wire form of the claims
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    sub: String,
    roles: Vec<Role>,
    iat: i64,
    exp: i64,
}

/// Claims recovered from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject: String,
    pub roles: BTreeSet<Role>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies bearer tokens with one process-wide key.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("key", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, TokenError> {
        if secret.len() < MIN_KEY_LEN {
            return Err(TokenError::WeakKey);
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    /// Build from the base64 key and TTL in the auth configuration
    pub fn from_config(config: &AuthConfig) -> Result<Self, TokenError> {
        let encoded = config.jwt_secret.trim();
        if encoded.is_empty() {
            return Err(TokenError::MissingKey);
        }
        let secret = base64::decode(encoded).map_err(|_| TokenError::KeyEncoding)?;
        Self::new(&secret, Duration::seconds(config.token_ttl_secs))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, principal: &Principal) -> Result<String, TokenError> {
        self.issue_at(principal, Utc::now())
    }

    pub fn issue_at(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String, TokenError> {
        let issued_at = now.timestamp();
        let claims = JwtClaims {
            sub: principal.identity_handle().to_string(),
            roles: principal.roles().iter().copied().collect(),
            iat: issued_at,
            exp: issued_at + self.ttl.num_seconds(),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Never fails loudly: any defect in the token yields `false`.
    pub fn validate(&self, token: &str) -> bool {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        match self.verify(token, now) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Token rejected: {}", e);
                false
            }
        }
    }

    /// Recover subject and roles. Checked: an invalid token is an error,
    /// not undefined behaviour.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.decode_at(token, Utc::now())
    }

    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        self.verify(token, now)
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        if token.trim().is_empty() {
            return Err(TokenError::Empty);
        }

        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => TokenError::UnsupportedAlgorithm,
                _ => TokenError::Malformed,
            }
        })?;

        let claims = data.claims;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        let issued_at = Utc.timestamp_opt(claims.iat, 0).single().ok_or(TokenError::Malformed)?;
        let expires_at = Utc.timestamp_opt(claims.exp, 0).single().ok_or(TokenError::Malformed)?;

        Ok(TokenClaims {
            subject: claims.sub,
            roles: claims.roles.into_iter().collect(),
            issued_at,
            expires_at,
        })
    }
}

/// Strip the bearer scheme from an `Authorization` value.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    authorization.strip_prefix(BEARER_PREFIX)
}
