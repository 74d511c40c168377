pub mod cookie;
pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{SecurityConfig, MAX_TTL_HOURS};

/// Generic message for every rejected credential, whatever the cause.
pub const AUTH_FAILURE_MESSAGE: &str = "authentication required";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

/// Which signing key a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Issued on sign-in, accepted by the auth gate.
    Session,
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Signs and verifies the three kinds of bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    session: SigningKeys,
    access: SigningKeys,
    refresh: SigningKeys,
    session_ttl: Option<Duration>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("session_ttl", &self.session_ttl)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

fn bounded_hours(hours: u64) -> Duration {
    Duration::hours(hours.min(MAX_TTL_HOURS) as i64)
}

impl TokenIssuer {
    pub fn new(security: &SecurityConfig) -> Self {
        Self {
            session: SigningKeys::from_secret(&security.session_secret),
            access: SigningKeys::from_secret(&security.access_secret),
            refresh: SigningKeys::from_secret(&security.refresh_secret),
            session_ttl: security.session_token_ttl_hours.map(bounded_hours),
            access_ttl: Duration::minutes(security.access_token_ttl_minutes.min(MAX_TTL_HOURS * 60) as i64),
            refresh_ttl: bounded_hours(security.refresh_token_ttl_hours),
        }
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign a token of the given kind for `user_id`.
    ///
    /// Refresh tokens get a random `jti` so two issued in the same second
    /// never collide in the session registry.
    pub fn issue(&self, kind: TokenKind, user_id: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let (keys, ttl) = match kind {
            TokenKind::Session => (&self.session, self.session_ttl),
            TokenKind::Access => (&self.access, Some(self.access_ttl)),
            TokenKind::Refresh => (&self.refresh, Some(self.refresh_ttl)),
        };

        let claims = Claims {
            user_id,
            iat: now.timestamp(),
            exp: ttl.map(|ttl| (now + ttl).timestamp()),
            jti: (kind == TokenKind::Refresh).then(|| Uuid::new_v4().to_string()),
        };

        encode(&Header::default(), &claims, &keys.encoding)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Verify signature (and `exp` when present) and return the claims.
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, AuthError> {
        let keys = match kind {
            TokenKind::Session => &self.session,
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        // Session tokens are time-unbounded by default; exp is checked only when present.
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}
