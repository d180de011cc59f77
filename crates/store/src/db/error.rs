//! Repository error taxonomy and driver-error classification.

use std::borrow::Cow;

use thiserror::Error;

/// Errors that can occur during repository operations.
///
/// Every variant that concerns a specific table carries the entity name and
/// the offending field or constraint so callers can react programmatically.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Requested entity was not found.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity name (e.g. `"Product"`).
        entity: &'static str,
        /// Rendered lookup key.
        key: String,
    },

    /// A unique or compound-unique constraint would be violated.
    #[error("{entity} violates unique constraint {constraint} on ({})", .fields.join(", "))]
    ConstraintViolation {
        /// Entity name.
        entity: &'static str,
        /// Constraint name (e.g. `"products_slug_key"`).
        constraint: String,
        /// Columns covered by the constraint.
        fields: Vec<String>,
    },

    /// A relation points to a row that does not exist, or a restricted
    /// parent still has dependents.
    #[error("{entity}.{field} violates foreign key {constraint}")]
    ForeignKeyViolation {
        /// Entity whose row carries (or is referenced by) the foreign key.
        entity: &'static str,
        /// Foreign key column.
        field: Cow<'static, str>,
        /// Constraint name (e.g. `"products_category_id_fkey"`).
        constraint: String,
    },

    /// A field failed validation before reaching storage.
    #[error("invalid {entity}.{field}: {message}")]
    Validation {
        /// Entity name.
        entity: &'static str,
        /// Offending field.
        field: Cow<'static, str>,
        /// Human-readable reason.
        message: String,
    },

    /// Connection, timeout or lock contention in the underlying store.
    ///
    /// Reads may be retried freely. Writes should only be retried when the
    /// caller can tell that the failed attempt did not commit.
    #[error("transient store error: {0}")]
    Transient(#[source] sqlx::Error),

    /// The caller-supplied deadline elapsed.
    ///
    /// A timed-out write may or may not have committed, so it is not
    /// reported as retryable.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Any other database error from sqlx.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl RepositoryError {
    /// Build a [`RepositoryError::NotFound`].
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Build a [`RepositoryError::Validation`].
    pub fn validation(
        entity: &'static str,
        field: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            entity,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the operation may be retried as-is, reads and writes alike.
    ///
    /// Only [`RepositoryError::Transient`] qualifies.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Whether a read that failed this way can be retried.
    ///
    /// Unlike [`Self::is_retryable`] this includes [`RepositoryError::Timeout`],
    /// which is only safe to retry when the timed-out operation wrote nothing.
    #[must_use]
    pub const fn is_retryable_read(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }

    /// Whether this is a [`RepositoryError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Classify a driver error raised while writing `entity`.
    ///
    /// Unique violations are decoded from the `SQLite` message, which names
    /// the table and every column of the violated index.
    pub(crate) fn from_write(entity: &'static str, err: sqlx::Error) -> Self {
        let sqlx::Error::Database(ref db_err) = err else {
            return Self::from(err);
        };

        let foreign_key = matches!(db_err.kind(), sqlx::error::ErrorKind::ForeignKeyViolation)
            || is_foreign_key_failure(db_err.code().as_deref(), db_err.message());
        if foreign_key {
            return Self::ForeignKeyViolation {
                entity,
                field: Cow::Borrowed("unknown"),
                constraint: "foreign_key".to_owned(),
            };
        }

        match db_err.kind() {
            sqlx::error::ErrorKind::UniqueViolation => {
                let (table, fields) = parse_unique_message(db_err.message());
                Self::ConstraintViolation {
                    entity,
                    constraint: format!("{table}_{}_key", fields.join("_")),
                    fields,
                }
            }
            sqlx::error::ErrorKind::CheckViolation | sqlx::error::ErrorKind::NotNullViolation => {
                let message = db_err.message().to_owned();
                let field = message
                    .split_once(": ")
                    .and_then(|(_, rest)| rest.split_whitespace().next())
                    .map(|f| f.rsplit('.').next().unwrap_or(f).to_owned())
                    .unwrap_or_default();
                Self::Validation {
                    entity,
                    field: Cow::Owned(field),
                    message,
                }
            }
            _ => Self::from(err),
        }
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if is_transient(&err) {
            Self::Transient(err)
        } else {
            Self::Database(err)
        }
    }
}

/// `SQLITE_CONSTRAINT_FOREIGNKEY`, and `SQLITE_CONSTRAINT_TRIGGER` which is
/// what an `ON DELETE RESTRICT` action raises.
const SQLITE_CONSTRAINT_FOREIGNKEY: &str = "787";
const SQLITE_CONSTRAINT_TRIGGER: &str = "1811";

fn is_foreign_key_failure(code: Option<&str>, message: &str) -> bool {
    match code {
        Some(SQLITE_CONSTRAINT_FOREIGNKEY) => true,
        Some(SQLITE_CONSTRAINT_TRIGGER) => message.starts_with("FOREIGN KEY constraint failed"),
        _ => false,
    }
}

/// `SQLITE_BUSY` and `SQLITE_LOCKED` primary result codes.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
        sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
        _ => false,
    }
}

/// Split `UNIQUE constraint failed: t.a, t.b` into `("t", ["a", "b"])`.
fn parse_unique_message(message: &str) -> (String, Vec<String>) {
    let columns = message
        .split_once(": ")
        .map_or(message, |(_, columns)| columns);

    let mut table = String::new();
    let fields = columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|qualified| match qualified.split_once('.') {
            Some((t, column)) => {
                if table.is_empty() {
                    t.clone_into(&mut table);
                }
                column.to_owned()
            }
            None => qualified.to_owned(),
        })
        .collect();
    (table, fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_column_unique_message() {
        let (table, fields) = parse_unique_message("UNIQUE constraint failed: users.email");
        assert_eq!(table, "users");
        assert_eq!(fields, vec!["email"]);
    }

    #[test]
    fn test_parse_compound_unique_message() {
        let (table, fields) = parse_unique_message(
            "UNIQUE constraint failed: translations.locale, translations.namespace, translations.key",
        );
        assert_eq!(table, "translations");
        assert_eq!(fields, vec!["locale", "namespace", "key"]);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(RepositoryError::from(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!RepositoryError::from(sqlx::Error::RowNotFound).is_retryable());
        assert!(!RepositoryError::not_found("User", 1).is_retryable());
    }

    #[test]
    fn test_timeout_is_only_retryable_for_reads() {
        let err = RepositoryError::Timeout(std::time::Duration::from_millis(5));
        assert!(!err.is_retryable());
        assert!(err.is_retryable_read());

        let err = RepositoryError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable_read());
        assert!(!RepositoryError::not_found("User", 1).is_retryable_read());
    }

    #[test]
    fn test_restrict_action_is_a_foreign_key_failure() {
        assert!(is_foreign_key_failure(
            Some("787"),
            "FOREIGN KEY constraint failed"
        ));
        assert!(is_foreign_key_failure(
            Some("1811"),
            "FOREIGN KEY constraint failed"
        ));
        assert!(!is_foreign_key_failure(Some("1811"), "raised by a trigger"));
        assert!(!is_foreign_key_failure(
            Some("2067"),
            "UNIQUE constraint failed: users.email"
        ));
        assert!(!is_foreign_key_failure(None, "FOREIGN KEY constraint failed"));
    }

    #[test]
    fn test_display_includes_structured_detail() {
        let err = RepositoryError::ConstraintViolation {
            entity: "Settings",
            constraint: "settings_key_key".to_owned(),
            fields: vec!["key".to_owned()],
        };
        assert_eq!(
            err.to_string(),
            "Settings violates unique constraint settings_key_key on (key)"
        );

        let err = RepositoryError::validation("Product", "stock_quantity", "must not be negative");
        assert_eq!(
            err.to_string(),
            "invalid Product.stock_quantity: must not be negative"
        );
    }
}
