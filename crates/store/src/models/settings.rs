//! Key/value configuration rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::SettingId;

use crate::db::query::define_fields;

/// A configuration value addressed by its unique key (e.g. `"site_banner"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub id: SettingId,
    pub key: String,
    pub value: String,
    pub image_url: Option<String>,
    pub image_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a setting.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSettingInput {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<SettingId>,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_key: Option<String>,
}

impl CreateSettingInput {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            key: key.into(),
            value: value.into(),
            image_url: None,
            image_key: None,
        }
    }
}

/// Input for updating a setting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSettingInput {
    pub key: Option<String>,
    pub value: Option<String>,
    pub image_url: Option<Option<String>>,
    pub image_key: Option<Option<String>>,
}

define_fields! {
    /// Filterable columns of [`Setting`].
    pub enum SettingField {
        Id => ("id", Text),
        Key => ("key", Text),
        Value => ("value", Text),
        ImageUrl => ("image_url", Text),
        ImageKey => ("image_key", Text),
        CreatedAt => ("created_at", Timestamp),
        UpdatedAt => ("updated_at", Timestamp),
    }
}
