//! Homepage carousel slides with independent desktop and mobile variants.
//!
//! Every slide carries three copies of its content: generic fields, and
//! desktop and mobile overrides. [`Slider::content_for`] resolves the copy
//! to render for a viewport field by field, falling back to the generic
//! value wherever the override is unset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::SliderId;

use crate::db::query::define_fields;

/// Target viewport for slide content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Viewport {
    Desktop,
    Mobile,
}

/// One copy of a slide's content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideContent {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub image_key: Option<String>,
    pub button_text: Option<String>,
    pub button_url: Option<String>,
}

impl SlideContent {
    /// Fill unset fields of `self` from `fallback`.
    #[must_use]
    pub fn or(self, fallback: &Self) -> Self {
        Self {
            title: self.title.or_else(|| fallback.title.clone()),
            subtitle: self.subtitle.or_else(|| fallback.subtitle.clone()),
            description: self.description.or_else(|| fallback.description.clone()),
            image_url: self.image_url.or_else(|| fallback.image_url.clone()),
            image_key: self.image_key.or_else(|| fallback.image_key.clone()),
            button_text: self.button_text.or_else(|| fallback.button_text.clone()),
            button_url: self.button_url.or_else(|| fallback.button_url.clone()),
        }
    }
}

/// A carousel slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slider {
    pub id: SliderId,
    /// Generic content, used where a viewport override is unset.
    pub content: SlideContent,
    pub desktop: SlideContent,
    pub mobile: SlideContent,
    pub is_active: bool,
    /// Display position, ascending.
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Slider {
    /// Content to render on `viewport`.
    #[must_use]
    pub fn content_for(&self, viewport: Viewport) -> SlideContent {
        let specific = match viewport {
            Viewport::Desktop => &self.desktop,
            Viewport::Mobile => &self.mobile,
        };
        specific.clone().or(&self.content)
    }
}

/// Input for creating a slide.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSliderInput {
    #[serde(default)]
    pub content: SlideContent,
    #[serde(default)]
    pub desktop: SlideContent,
    #[serde(default)]
    pub mobile: SlideContent,
    pub is_active: bool,
    #[serde(default)]
    pub order: i32,
}

/// Input for updating a slide. A supplied content block replaces the stored
/// block as a whole.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSliderInput {
    pub content: Option<SlideContent>,
    pub desktop: Option<SlideContent>,
    pub mobile: Option<SlideContent>,
    pub is_active: Option<bool>,
    pub order: Option<i32>,
}

define_fields! {
    /// Filterable columns of [`Slider`].
    pub enum SliderField {
        Id => ("id", Int),
        Title => ("title", Text),
        Subtitle => ("subtitle", Text),
        Description => ("description", Text),
        ImageUrl => ("image_url", Text),
        ImageKey => ("image_key", Text),
        ButtonText => ("button_text", Text),
        ButtonUrl => ("button_url", Text),
        DesktopTitle => ("desktop_title", Text),
        DesktopSubtitle => ("desktop_subtitle", Text),
        DesktopDescription => ("desktop_description", Text),
        DesktopImageUrl => ("desktop_image_url", Text),
        DesktopImageKey => ("desktop_image_key", Text),
        DesktopButtonText => ("desktop_button_text", Text),
        DesktopButtonUrl => ("desktop_button_url", Text),
        MobileTitle => ("mobile_title", Text),
        MobileSubtitle => ("mobile_subtitle", Text),
        MobileDescription => ("mobile_description", Text),
        MobileImageUrl => ("mobile_image_url", Text),
        MobileImageKey => ("mobile_image_key", Text),
        MobileButtonText => ("mobile_button_text", Text),
        MobileButtonUrl => ("mobile_button_url", Text),
        IsActive => ("is_active", Bool),
        Order => ("sort_order", Int),
        CreatedAt => ("created_at", Timestamp),
        UpdatedAt => ("updated_at", Timestamp),
    }
}

impl SliderField {
    /// Columns of one content block, in [`SlideContent`] field order.
    #[must_use]
    pub const fn block(viewport: Option<Viewport>) -> [Self; 7] {
        match viewport {
            None => [
                Self::Title,
                Self::Subtitle,
                Self::Description,
                Self::ImageUrl,
                Self::ImageKey,
                Self::ButtonText,
                Self::ButtonUrl,
            ],
            Some(Viewport::Desktop) => [
                Self::DesktopTitle,
                Self::DesktopSubtitle,
                Self::DesktopDescription,
                Self::DesktopImageUrl,
                Self::DesktopImageKey,
                Self::DesktopButtonText,
                Self::DesktopButtonUrl,
            ],
            Some(Viewport::Mobile) => [
                Self::MobileTitle,
                Self::MobileSubtitle,
                Self::MobileDescription,
                Self::MobileImageUrl,
                Self::MobileImageKey,
                Self::MobileButtonText,
                Self::MobileButtonUrl,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn text(s: &str) -> Option<String> {
        Some(s.to_owned())
    }

    fn slide() -> Slider {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Slider {
            id: SliderId::new(1),
            content: SlideContent {
                title: text("Summer sale"),
                image_url: text("https://cdn.example.com/summer.jpg"),
                button_text: text("Shop now"),
                button_url: text("/sale"),
                ..SlideContent::default()
            },
            desktop: SlideContent {
                image_url: text("https://cdn.example.com/summer-wide.jpg"),
                ..SlideContent::default()
            },
            mobile: SlideContent {
                title: text("Sale"),
                ..SlideContent::default()
            },
            is_active: true,
            order: 0,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_desktop_override_with_fallback() {
        let content = slide().content_for(Viewport::Desktop);
        assert_eq!(content.title.as_deref(), Some("Summer sale"));
        assert_eq!(
            content.image_url.as_deref(),
            Some("https://cdn.example.com/summer-wide.jpg")
        );
        assert_eq!(content.button_url.as_deref(), Some("/sale"));
    }

    #[test]
    fn test_mobile_override_with_fallback() {
        let content = slide().content_for(Viewport::Mobile);
        assert_eq!(content.title.as_deref(), Some("Sale"));
        assert_eq!(
            content.image_url.as_deref(),
            Some("https://cdn.example.com/summer.jpg")
        );
        assert_eq!(content.subtitle, None);
    }

    #[test]
    fn test_block_columns_follow_viewport_prefix() {
        use crate::db::query::Field;

        for field in SliderField::block(Some(Viewport::Mobile)) {
            assert!(field.column().starts_with("mobile_"));
        }
        for field in SliderField::block(Some(Viewport::Desktop)) {
            assert!(field.column().starts_with("desktop_"));
        }
        assert_eq!(SliderField::block(None)[0].column(), "title");
    }
}
