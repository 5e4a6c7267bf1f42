//! Port abstraction for user persistence adapters and their errors.
use async_trait::async_trait;

use crate::domain::{User, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// Another user already holds this email address.
        DuplicateEmail { email: String } => "a user with email {email} already exists",
    }
}

/// Data access for the user store.
///
/// Every mutating call commits on its own; no transaction spans calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError>;

    /// Fetch every stored user, in no particular order.
    async fn list(&self) -> Result<Vec<User>, UserPersistenceError>;

    /// Persist a new user, failing with [`UserPersistenceError::DuplicateEmail`]
    /// when the email is taken.
    async fn insert(&self, user: &User) -> Result<(), UserPersistenceError>;
}
