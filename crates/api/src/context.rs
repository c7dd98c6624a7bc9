//! Per-request authenticated identity.

use lingora_core::UserId;

/// Identity attached by the auth middleware; present on every protected
/// route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    user_id: UserId,
    jti: String,
}

impl AuthContext {
    pub fn new(user_id: UserId, jti: String) -> Self {
        Self { user_id, jti }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn jti(&self) -> &str {
        &self.jti
    }
}
