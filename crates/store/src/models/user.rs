//! Users: the identity record behind accounts and sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::{Email, Role, UserId};

use crate::db::query::define_fields;

/// A site user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: Option<String>,
    /// Email address, unique when present.
    pub email: Option<Email>,
    /// When the email address was verified.
    pub email_verified: Option<DateTime<Utc>>,
    /// Avatar image URL.
    pub image: Option<String>,
    /// Authorization role.
    pub role: Role,
}

/// Input for creating a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserInput {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub role: Role,
}

/// Input for updating a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    pub name: Option<Option<String>>,
    pub email: Option<Option<Email>>,
    pub email_verified: Option<Option<DateTime<Utc>>>,
    pub image: Option<Option<String>>,
    pub role: Option<Role>,
}

define_fields! {
    /// Filterable columns of [`User`].
    pub enum UserField {
        Id => ("id", Int),
        Name => ("name", Text),
        Email => ("email", Text),
        EmailVerified => ("email_verified", Timestamp),
        Image => ("image", Text),
        Role => ("role", Text),
    }
}
