//! Domain primitives, ports, and use-cases.
//!
//! Purpose: define strongly typed entities used by the HTTP and persistence
//! layers without depending on either. Keep types immutable and document
//! invariants in each type's Rustdoc.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - CorrelationId: request-scoped log correlation token.
//! - User and its value types.
//! - UserService: get, list, and create use-cases over the repository port.

pub mod correlation_id;
pub mod error;
pub mod ports;
pub mod user;
pub mod user_service;

pub use self::correlation_id::{CORRELATION_ID_HEADER, CorrelationId, CorrelationIdError};
pub use self::error::{Error, ErrorCode};
pub use self::user::{
    EMAIL_MAX, Email, NewUser, PERSON_NAME_MAX, PersonName, User, UserId, UserValidationError,
};
pub use self::user_service::UserService;
