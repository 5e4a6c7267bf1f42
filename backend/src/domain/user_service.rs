//! User use-cases sitting between the HTTP adapter and the repository port.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{Error, NewUser, User, UserId};

fn map_repository_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::DuplicateEmail { email } => {
            Error::conflict(format!("a user with email {email} already exists"))
        }
        UserPersistenceError::Connection { message } => {
            warn!(%message, "user repository unavailable");
            Error::service_unavailable("user store is unavailable")
        }
        UserPersistenceError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
    }
}

/// Reads and creates users through a [`UserRepository`].
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    /// Create a service backed by `repository`.
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    /// Fetch a single user.
    ///
    /// # Errors
    /// Returns a `not_found` error when no user has this id, otherwise the
    /// mapped repository failure.
    pub async fn get(&self, id: &UserId) -> Result<User, Error> {
        self.repository
            .find_by_id(id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("user {id} not found")))
    }

    /// Fetch every user.
    ///
    /// # Errors
    /// Returns the mapped repository failure.
    pub async fn list(&self) -> Result<Vec<User>, Error> {
        self.repository.list().await.map_err(map_repository_error)
    }

    /// Assign a fresh identifier to `new_user` and persist it.
    ///
    /// # Errors
    /// Returns `conflict` for a taken email, otherwise the mapped repository
    /// failure.
    pub async fn create(&self, new_user: NewUser) -> Result<User, Error> {
        let user = new_user.into_user(UserId::random());
        if let Err(error) = self.repository.insert(&user).await {
            warn!(%error, email = %user.email(), "user creation failed");
            return Err(map_repository_error(error));
        }
        info!(
            user_id = %user.id(),
            email = %user.email(),
            first_name = %user.first_name(),
            last_name = %user.last_name(),
            "user created"
        );
        Ok(user)
    }
}
