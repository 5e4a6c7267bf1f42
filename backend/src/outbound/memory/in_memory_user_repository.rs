//! `UserRepository` held in process memory.
//!
//! Mirrors the PostgreSQL adapter's contract: ids are primary keys and email
//! addresses are unique. Contents are lost when the process exits.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{User, UserId};

/// Map-backed user store guarded by a read/write lock.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> UserPersistenceError {
    UserPersistenceError::query("in-memory user store lock poisoned")
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, UserPersistenceError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.values().cloned().collect())
    }

    async fn insert(&self, user: &User) -> Result<(), UserPersistenceError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.values().any(|existing| existing.email() == user.email()) {
            return Err(UserPersistenceError::duplicate_email(user.email().as_ref()));
        }
        if users.contains_key(user.id()) {
            return Err(UserPersistenceError::query(format!(
                "user {} already exists",
                user.id()
            )));
        }
        users.insert(*user.id(), user.clone());
        Ok(())
    }
}
