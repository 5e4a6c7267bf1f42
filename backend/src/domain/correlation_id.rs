//! Request-scoped correlation identifier shared by logs and error payloads.
//!
//! `CorrelationId` follows a request through the system. Callers may supply
//! their own value through the `X-Correlation-Id` header; otherwise a UUID v4
//! is generated. The active identifier lives in task-local storage so domain
//! code can read it without explicit parameter threading.
//!
//! Tokio task-local variables are not inherited across spawned tasks. Use
//! [`CorrelationId::scope`] when spawning new tasks or moving work onto
//! blocking threads so the identifier propagates correctly.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use tokio::task_local;
use uuid::Uuid;

/// HTTP header carrying the correlation identifier on requests and responses.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

task_local! {
    /// Task-local storage for the current correlation identifier.
    pub(crate) static CORRELATION_ID: CorrelationId;
}

/// Validation errors returned by [`CorrelationId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorrelationIdError {
    /// The supplied value was empty or whitespace only.
    #[error("correlation id must not be empty")]
    Empty,
    /// The supplied value contained characters outside printable ASCII.
    #[error("correlation id must contain printable ASCII characters only")]
    InvalidCharacters,
}

/// Opaque per-request correlation token.
///
/// # Examples
/// ```
/// use workshop::domain::CorrelationId;
///
/// async fn handler() {
///     if let Some(id) = CorrelationId::current() {
///         println!("correlation id: {id}");
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    /// Accept a caller-supplied identifier verbatim.
    ///
    /// # Errors
    /// Returns [`CorrelationIdError`] when the value is blank or contains
    /// characters that cannot be echoed back in a response header.
    pub fn parse(raw: &str) -> Result<Self, CorrelationIdError> {
        if raw.trim().is_empty() {
            return Err(CorrelationIdError::Empty);
        }
        if !raw.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
            return Err(CorrelationIdError::InvalidCharacters);
        }
        Ok(Self(Arc::from(raw)))
    }

    /// Returns the identifier in scope for the current task, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        CORRELATION_ID.try_with(Clone::clone).ok()
    }

    /// Borrow the identifier as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Execute the provided future with `correlation_id` in scope.
    ///
    /// # Examples
    /// ```
    /// use workshop::domain::CorrelationId;
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let id = CorrelationId::parse("abc-123").expect("valid id");
    /// let observed = CorrelationId::scope(id.clone(), async { CorrelationId::current() }).await;
    /// assert_eq!(observed, Some(id));
    /// # });
    /// ```
    pub async fn scope<Fut>(correlation_id: CorrelationId, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        CORRELATION_ID.scope(correlation_id, fut).await
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CorrelationId {
    type Err = CorrelationIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
