//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain use-cases and remain testable without I/O.

use std::sync::Arc;

use crate::domain::UserService;
use crate::domain::ports::UserRepository;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub users: UserService,
}

impl HttpState {
    /// Construct state around an existing service.
    pub fn new(users: UserService) -> Self {
        Self { users }
    }

    /// Construct state directly from a repository implementation.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use workshop::inbound::http::state::HttpState;
    /// use workshop::outbound::memory::InMemoryUserRepository;
    ///
    /// let state = HttpState::from_repository(Arc::new(InMemoryUserRepository::new()));
    /// let _users = state.users.clone();
    /// ```
    pub fn from_repository(repository: Arc<dyn UserRepository>) -> Self {
        Self::new(UserService::new(repository))
    }
}
