//! Login sessions owned by a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::{SessionId, UserId};

use super::User;
use crate::db::query::define_fields;

/// An active login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Opaque session token, unique across sessions.
    pub session_token: String,
    pub user_id: UserId,
    pub expires: DateTime<Utc>,
}

impl Session {
    /// Whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

/// A session together with its owning user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWithUser {
    pub session: Session,
    pub user: User,
}

/// Input for creating a session.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionInput {
    pub session_token: String,
    pub user_id: UserId,
    pub expires: DateTime<Utc>,
}

/// Input for updating a session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSessionInput {
    pub session_token: Option<String>,
    pub user_id: Option<UserId>,
    pub expires: Option<DateTime<Utc>>,
}

define_fields! {
    /// Filterable columns of [`Session`].
    pub enum SessionField {
        Id => ("id", Int),
        SessionToken => ("session_token", Text),
        UserId => ("user_id", Int),
        Expires => ("expires", Timestamp),
    }
}
