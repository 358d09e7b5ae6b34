//! Identity and secret value objects parsed from a dump line: [`User`] (the
//! leaked e-mail address) and [`Credentials`] (the leaked password), plus the
//! SHA-256 digest stored alongside each of them.
//!
//! Both types are validated once at construction and are compared and hashed
//! by their natural key only, so a `User` whose key has already been resolved
//! still equals the freshly parsed one with the same address.
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::table::AutoGenKey;

pub const MAX_EMAIL_LEN: usize = 130;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} can not be empty")]
    Empty(&'static str),
    #[error("{field} constraints are not met (max {max} characters)")]
    TooLong { field: &'static str, max: usize },
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error("invalid date {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Trim `raw` and check it is non-empty and at most `max` characters long.
pub(crate) fn bounded(
    raw: &str,
    field: &'static str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// A leaked account, identified by its e-mail address.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: AutoGenKey,
    pub email: String,
}

impl User {
    pub fn new(email: &str) -> Result<Self, ValidationError> {
        let email = bounded(email, "user email", MAX_EMAIL_LEN)?;
        if !EMAIL_RE.is_match(&email) {
            return Err(ValidationError::InvalidEmail(email));
        }
        Ok(Self {
            user_id: AutoGenKey::UNASSIGNED,
            email,
        })
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.email == other.email
    }
}

impl Eq for User {}

impl Hash for User {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.email.hash(state);
    }
}

/// Trimmed, non-empty password text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Password(String);

impl Password {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty("password"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub cred_id: AutoGenKey,
    pub password: Password,
}

impl Credentials {
    pub fn new(password: Password) -> Self {
        Self {
            cred_id: AutoGenKey::UNASSIGNED,
            password,
        }
    }
}

impl PartialEq for Credentials {
    fn eq(&self, other: &Self) -> bool {
        self.password == other.password
    }
}

impl Eq for Credentials {}

impl Hash for Credentials {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.password.hash(state);
    }
}

/// Lowercase hex SHA-256 digest of a secret field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashDigest(String);

impl HashDigest {
    pub fn of(plain_text: &str) -> Self {
        Self(hex::encode(Sha256::digest(plain_text.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
