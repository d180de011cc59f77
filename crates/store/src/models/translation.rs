//! Localised strings addressed by `(locale, namespace, key)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::TranslationId;

use crate::db::query::define_fields;

/// One translated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: TranslationId,
    /// BCP 47 locale tag (e.g. `"en"`, `"pt-BR"`).
    pub locale: String,
    /// Grouping such as a page or component name.
    pub namespace: String,
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a translation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTranslationInput {
    pub locale: String,
    pub namespace: String,
    pub key: String,
    pub value: String,
}

impl CreateTranslationInput {
    #[must_use]
    pub fn new(
        locale: impl Into<String>,
        namespace: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            locale: locale.into(),
            namespace: namespace.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Input for updating a translation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTranslationInput {
    pub locale: Option<String>,
    pub namespace: Option<String>,
    pub key: Option<String>,
    pub value: Option<String>,
}

define_fields! {
    /// Filterable columns of [`Translation`].
    pub enum TranslationField {
        Id => ("id", Int),
        Locale => ("locale", Text),
        Namespace => ("namespace", Text),
        Key => ("key", Text),
        Value => ("value", Text),
        CreatedAt => ("created_at", Timestamp),
        UpdatedAt => ("updated_at", Timestamp),
    }
}
