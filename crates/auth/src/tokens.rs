//! Token issuing and verification (HS256, stateless).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use lingora_core::UserId;

use crate::claims::{TokenClaims, TokenType};

/// Errors from token verification.
///
/// Callers translating these to HTTP must collapse them into one generic
/// rejection; the distinctions exist for logging and tests only.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is malformed, tampered with, or expired")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("unexpected token type: got {got}, want {want}")]
    WrongType { got: TokenType, want: TokenType },

    #[error("token is missing a jti claim")]
    MissingJti,
}

/// An access/refresh pair returned by login, signup, and refresh rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenPair {
    pub fn bearer(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Signs and verifies expiring HS256 tokens.
///
/// The issuer is stateless by design: it knows nothing about revocation.
/// Callers must check the returned `jti` against the revocation ledger.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue_access(&self, user_id: &UserId) -> Result<String, TokenError> {
        self.issue(user_id, TokenType::Access, self.access_ttl)
    }

    pub fn issue_refresh(&self, user_id: &UserId) -> Result<String, TokenError> {
        self.issue(user_id, TokenType::Refresh, self.refresh_ttl)
    }

    /// Issue a fresh access+refresh pair for `user_id`.
    pub fn issue_pair(&self, user_id: &UserId) -> Result<TokenPair, TokenError> {
        Ok(TokenPair::bearer(
            self.issue_access(user_id)?,
            self.issue_refresh(user_id)?,
        ))
    }

    fn issue(
        &self,
        user_id: &UserId,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id.as_str().to_string(),
            token_type,
            jti: Uuid::now_v7().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?;
        Ok(token)
    }

    /// Verify signature and expiry and check the token is of the expected
    /// kind with a usable `jti`.
    ///
    /// Revocation is deliberately *not* checked here (see crate docs).
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.required_spec_claims.insert("exp".to_string());

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)?;
        let claims = data.claims;

        if claims.token_type != expected {
            return Err(TokenError::WrongType {
                got: claims.token_type,
                want: expected,
            });
        }
        if claims.jti.is_empty() {
            return Err(TokenError::MissingJti);
        }

        Ok(claims)
    }

    /// Expiry of a set of claims as a UTC timestamp.
    pub fn expiry_of(claims: &TokenClaims) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now)
    }
}
