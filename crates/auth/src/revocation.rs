//! Revocation ledger record model.
//!
//! A `jti` enters the ledger when its refresh token is consumed (rotation)
//! or on logout. Once present it is rejected until its natural expiry, after
//! which cleanup may purge it. Entries are never overwritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lingora_core::UserId;

use crate::claims::{TokenClaims, TokenType};

/// A revoked token identifier with enough context for cleanup and erasure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokedToken {
    pub jti: String,
    pub user_id: UserId,
    pub token_type: TokenType,
    /// The token's own expiry; past this instant the entry is garbage.
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RevokedToken {
    /// Build a ledger entry from verified claims, keeping the token's
    /// original expiry so cleanup can purge it once naturally expired.
    pub fn from_claims(claims: &TokenClaims, user_id: UserId) -> Self {
        Self {
            jti: claims.jti.clone(),
            user_id,
            token_type: claims.token_type,
            expires_at: DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now),
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
