//! User data model.
//!
//! Field limits mirror the `users` table constraints so oversize values are
//! rejected before they reach the store. Email format is deliberately not
//! checked; uniqueness is enforced by the repository.

use std::fmt;

use uuid::Uuid;

/// Maximum length of an email address, in characters.
pub const EMAIL_MAX: usize = 255;
/// Maximum length of a first or last name, in characters.
pub const PERSON_NAME_MAX: usize = 96;

/// Validation errors returned by the user value constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    #[error("user id must be a valid UUID")]
    InvalidId,
    #[error("email must be at most {max} characters")]
    EmailTooLong { max: usize },
    #[error("{field} must be at most {max} characters")]
    NameTooLong { field: &'static str, max: usize },
}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(Uuid);

impl UserId {
    /// Validate and construct a [`UserId`] from text.
    ///
    /// # Errors
    /// Returns [`UserValidationError::InvalidId`] when `id` is not a UUID.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Uuid::parse_str(id.as_ref())
            .map(Self)
            .map_err(|_| UserValidationError::InvalidId)
    }

    /// Generate a new random [`UserId`].
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID, typically read back from storage.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Email address, unique across users.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Construct an [`Email`], enforcing the column length limit.
    ///
    /// # Errors
    /// Returns [`UserValidationError::EmailTooLong`] past [`EMAIL_MAX`] characters.
    pub fn new(email: impl Into<String>) -> Result<Self, UserValidationError> {
        let email = email.into();
        if email.chars().count() > EMAIL_MAX {
            return Err(UserValidationError::EmailTooLong { max: EMAIL_MAX });
        }
        Ok(Self(email))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First or last name of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName(String);

impl PersonName {
    /// Construct a [`PersonName`] for `field`, enforcing the column length limit.
    ///
    /// `field` only names the offending input in validation errors.
    ///
    /// # Errors
    /// Returns [`UserValidationError::NameTooLong`] past [`PERSON_NAME_MAX`] characters.
    pub fn new(field: &'static str, name: impl Into<String>) -> Result<Self, UserValidationError> {
        let name = name.into();
        if name.chars().count() > PERSON_NAME_MAX {
            return Err(UserValidationError::NameTooLong {
                field,
                max: PERSON_NAME_MAX,
            });
        }
        Ok(Self(name))
    }
}

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated payload for creating a user; the identifier is assigned later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    email: Email,
    first_name: PersonName,
    last_name: PersonName,
}

impl NewUser {
    /// Bundle validated components.
    #[must_use]
    pub fn new(email: Email, first_name: PersonName, last_name: PersonName) -> Self {
        Self {
            email,
            first_name,
            last_name,
        }
    }

    /// Validate raw strings into a [`NewUser`].
    ///
    /// # Errors
    /// Returns the first [`UserValidationError`] encountered.
    pub fn try_from_strings(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        Ok(Self::new(
            Email::new(email)?,
            PersonName::new("firstName", first_name)?,
            PersonName::new("lastName", last_name)?,
        ))
    }

    /// Email the new user will be registered under.
    #[must_use]
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Attach an identifier, producing the persisted shape.
    #[must_use]
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
        }
    }
}

/// Application user.
///
/// ## Invariants
/// - `id` is assigned on creation and never changes.
/// - `email` fits [`EMAIL_MAX`]; names fit [`PERSON_NAME_MAX`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    email: Email,
    first_name: PersonName,
    last_name: PersonName,
}

impl User {
    /// Build a [`User`] from validated components.
    #[must_use]
    pub fn new(id: UserId, email: Email, first_name: PersonName, last_name: PersonName) -> Self {
        Self {
            id,
            email,
            first_name,
            last_name,
        }
    }

    /// Fallible constructor from raw strings.
    ///
    /// # Errors
    /// Returns the first [`UserValidationError`] encountered.
    pub fn try_from_strings(
        id: impl AsRef<str>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        let id = UserId::new(id)?;
        Ok(NewUser::try_from_strings(email, first_name, last_name)?.into_user(id))
    }

    /// Stable user identifier.
    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Unique email address.
    #[must_use]
    pub fn email(&self) -> &Email {
        &self.email
    }

    #[must_use]
    pub fn first_name(&self) -> &PersonName {
        &self.first_name
    }

    #[must_use]
    pub fn last_name(&self) -> &PersonName {
        &self.last_name
    }
}
