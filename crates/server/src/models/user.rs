//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use planbe_core::{Email, UserId};

/// A customer account (domain type).
///
/// Serializes as the public profile: the password hash never leaves the
/// repository layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    /// Account kind, e.g. "customer".
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub surname: String,
    pub email: Email,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "Name Surname", as used in email greetings.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_owned()
    }
}

/// Validated input for creating an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub kind: String,
    pub name: String,
    pub surname: String,
    pub email: Email,
    pub username: String,
    pub password_hash: String,
}

/// Validated replacement values for an account.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub kind: String,
    pub name: String,
    pub surname: String,
    pub email: Email,
    pub username: String,
    pub password_hash: String,
}
