//! Record stores for credentials, roles, and the token revocation ledger.
//!
//! Traits here are the persistence seams; the in-memory implementations are
//! the reference backends used by tests and single-node deployments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lingora_auth::{RevokedToken, Role};
use lingora_core::UserId;

pub mod in_memory;

pub use in_memory::{InMemoryCredentialStore, InMemoryRevocationStore, InMemoryRoleStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    Duplicate(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// A user's login credential. The hash is the PHC-style string produced by
/// `lingora_auth::password::hash_password`; plaintext never reaches a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub user_id: UserId,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

pub trait CredentialStore: Send + Sync {
    /// Insert a new credential. Fails with [`StoreError::Duplicate`] if the
    /// user already exists.
    fn insert(&self, credential: Credential) -> Result<(), StoreError>;

    fn get(&self, user_id: &UserId) -> Result<Option<Credential>, StoreError>;

    /// Remove the credential; reports whether one existed.
    fn delete_for_user(&self, user_id: &UserId) -> Result<bool, StoreError>;
}

/// Role assignments. Absence of a record means [`Role::User`], so this store
/// only ever holds explicit grants.
pub trait RoleStore: Send + Sync {
    fn role_of(&self, user_id: &UserId) -> Result<Role, StoreError>;

    fn set_role(&self, user_id: &UserId, role: Role) -> Result<(), StoreError>;

    /// Drop the explicit grant, if any; the user falls back to the default.
    fn delete_for_user(&self, user_id: &UserId) -> Result<bool, StoreError>;
}

/// The token revocation ledger. Keyed by `jti`; entries persist until
/// naturally expired and purged.
pub trait RevocationStore: Send + Sync {
    /// Record a revocation. Re-revoking an already-present `jti` is benign
    /// and leaves the original entry untouched.
    fn revoke(&self, entry: RevokedToken) -> Result<(), StoreError>;

    fn is_revoked(&self, jti: &str) -> Result<bool, StoreError>;

    /// Drop entries whose tokens have expired on their own; returns the
    /// number purged.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Erase every ledger entry belonging to a user; returns the number
    /// removed.
    fn delete_for_user(&self, user_id: &UserId) -> Result<usize, StoreError>;

    fn len(&self) -> Result<usize, StoreError>;
}
