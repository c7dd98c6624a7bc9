use serde::{Deserialize, Serialize};

/// Token kind carried in the `type` claim.
///
/// Access tokens are short-lived and authenticate ordinary requests; refresh
/// tokens are long-lived, single-use (rotation revokes the consumed `jti`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl core::fmt::Display for TokenType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims model.
///
/// `jti` is the unit of revocation: every issued token carries a fresh unique
/// id, and the revocation ledger stores consumed/invalidated `jti` values
/// until their natural expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — the authenticated user id.
    pub sub: String,

    /// Token kind (`access` | `refresh`).
    #[serde(rename = "type")]
    pub token_type: TokenType,

    /// Unique token identifier (unit of revocation).
    pub jti: String,

    /// Issued-at (unix seconds).
    pub iat: i64,

    /// Expiry (unix seconds).
    pub exp: i64,
}
