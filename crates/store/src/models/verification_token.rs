//! One-time tokens for passwordless sign-in.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::query::{Value, define_fields};
use crate::db::table::TableKey;

/// A verification token, addressed by `(identifier, token)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationToken {
    /// What the token verifies, usually an email address.
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
}

impl VerificationToken {
    /// Whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

/// Compound key of a [`VerificationToken`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VerificationTokenKey {
    pub identifier: String,
    pub token: String,
}

impl VerificationTokenKey {
    #[must_use]
    pub fn new(identifier: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            token: token.into(),
        }
    }
}

// The token itself is a credential and stays out of logs and error text.
impl fmt::Display for VerificationTokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (token redacted)", self.identifier)
    }
}

impl TableKey for VerificationTokenKey {
    fn key_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.identifier.clone()),
            Value::Text(self.token.clone()),
        ]
    }
}

/// Input for issuing a token.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVerificationTokenInput {
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
}

define_fields! {
    /// Filterable columns of [`VerificationToken`].
    pub enum VerificationTokenField {
        Identifier => ("identifier", Text),
        Token => ("token", Text),
        Expires => ("expires", Timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display_hides_token() {
        let key = VerificationTokenKey::new("a@example.com", "s3cr3t");
        let shown = key.to_string();
        assert!(shown.contains("a@example.com"));
        assert!(!shown.contains("s3cr3t"));
    }
}
