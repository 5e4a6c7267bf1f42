//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered users. `email` carries the `users_email_key` unique index.
    users (id) {
        /// Primary key: UUID v4 assigned on creation.
        id -> Uuid,
        /// Unique email address (max 255 characters).
        #[max_length = 255]
        email -> Varchar,
        /// Given name (max 96 characters).
        #[max_length = 96]
        first_name -> Varchar,
        /// Family name (max 96 characters).
        #[max_length = 96]
        last_name -> Varchar,
    }
}
