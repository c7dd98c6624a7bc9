//! In-memory store backends behind `RwLock<HashMap>`.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use lingora_auth::{RevokedToken, Role};
use lingora_core::UserId;

use super::{Credential, CredentialStore, RevocationStore, RoleStore, StoreError};

fn poisoned() -> StoreError {
    StoreError::Backend("store lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<UserId, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn insert(&self, credential: Credential) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        if records.contains_key(&credential.user_id) {
            return Err(StoreError::Duplicate(credential.user_id.to_string()));
        }
        records.insert(credential.user_id.clone(), credential);
        Ok(())
    }

    fn get(&self, user_id: &UserId) -> Result<Option<Credential>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(user_id).cloned())
    }

    fn delete_for_user(&self, user_id: &UserId) -> Result<bool, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        Ok(records.remove(user_id).is_some())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    grants: RwLock<HashMap<UserId, Role>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoleStore for InMemoryRoleStore {
    fn role_of(&self, user_id: &UserId) -> Result<Role, StoreError> {
        let grants = self.grants.read().map_err(|_| poisoned())?;
        Ok(grants.get(user_id).copied().unwrap_or_default())
    }

    fn set_role(&self, user_id: &UserId, role: Role) -> Result<(), StoreError> {
        let mut grants = self.grants.write().map_err(|_| poisoned())?;
        grants.insert(user_id.clone(), role);
        Ok(())
    }

    fn delete_for_user(&self, user_id: &UserId) -> Result<bool, StoreError> {
        let mut grants = self.grants.write().map_err(|_| poisoned())?;
        Ok(grants.remove(user_id).is_some())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    entries: RwLock<HashMap<String, RevokedToken>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RevocationStore for InMemoryRevocationStore {
    fn revoke(&self, entry: RevokedToken) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        // First revocation wins; repeats are a no-op.
        entries.entry(entry.jti.clone()).or_insert(entry);
        Ok(())
    }

    fn is_revoked(&self, jti: &str) -> Result<bool, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.contains_key(jti))
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }

    fn delete_for_user(&self, user_id: &UserId) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let before = entries.len();
        entries.retain(|_, entry| entry.user_id != *user_id);
        Ok(before - entries.len())
    }

    fn len(&self) -> Result<usize, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.len())
    }
}
