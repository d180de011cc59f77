//! Announcement bar entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::TopBarId;

use crate::db::query::define_fields;

/// An announcement shown above the site header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopBar {
    pub id: TopBarId,
    pub title: String,
    /// Link target.
    pub url: String,
    pub icon: Option<String>,
    pub is_active: bool,
    /// Display position, ascending.
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an announcement.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTopBarInput {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub order: i32,
}

/// Input for updating an announcement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTopBarInput {
    pub title: Option<String>,
    pub url: Option<String>,
    pub icon: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub order: Option<i32>,
}

define_fields! {
    /// Filterable columns of [`TopBar`].
    pub enum TopBarField {
        Id => ("id", Int),
        Title => ("title", Text),
        Url => ("url", Text),
        Icon => ("icon", Text),
        IsActive => ("is_active", Bool),
        Order => ("sort_order", Int),
        CreatedAt => ("created_at", Timestamp),
        UpdatedAt => ("updated_at", Timestamp),
    }
}
