//! Integration tests for translations, sliders, announcement bars and settings.

use catalog_core::SliderId;
use catalog_integration_tests::store;
use catalog_store::models::{
    CreateSettingInput, CreateSliderInput, CreateTopBarInput, CreateTranslationInput,
    SlideContent, UpdateSliderInput, UpdateTranslationInput, Viewport,
};
use catalog_store::{
    RepositoryError, SettingsRepository, SliderRepository, TopBarRepository,
    TranslationRepository,
};

fn text(s: &str) -> Option<String> {
    Some(s.to_owned())
}

// =============================================================================
// Translations
// =============================================================================

#[tokio::test]
async fn test_translation_address_is_unique() {
    let pool = store().await;
    let translations = TranslationRepository::new(&pool);

    translations
        .create(&CreateTranslationInput::new("en", "home", "title", "Welcome"))
        .await
        .unwrap();
    // Same key in another namespace or locale is a different string.
    translations
        .create(&CreateTranslationInput::new("en", "cart", "title", "Your cart"))
        .await
        .unwrap();
    translations
        .create(&CreateTranslationInput::new("de", "home", "title", "Willkommen"))
        .await
        .unwrap();

    let err = translations
        .create(&CreateTranslationInput::new("en", "home", "title", "Hello"))
        .await
        .unwrap_err();
    match err {
        RepositoryError::ConstraintViolation { constraint, .. } => {
            assert_eq!(constraint, "translations_locale_namespace_key_key");
        }
        other => panic!("expected ConstraintViolation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_translation_blank_key_is_rejected() {
    let pool = store().await;

    let err = TranslationRepository::new(&pool)
        .create(&CreateTranslationInput::new("en", "home", " ", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Validation { ref field, .. } if field == "key"));
}

#[tokio::test]
async fn test_translation_upsert_and_namespace() {
    let pool = store().await;
    let translations = TranslationRepository::new(&pool);

    let first = translations
        .upsert(&CreateTranslationInput::new("en", "home", "title", "Welcome"))
        .await
        .unwrap();
    let second = translations
        .upsert(&CreateTranslationInput::new("en", "home", "title", "Welcome back"))
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.value, "Welcome back");

    translations
        .upsert(&CreateTranslationInput::new("en", "home", "cta", "Shop now"))
        .await
        .unwrap();
    translations
        .upsert(&CreateTranslationInput::new("fr", "home", "title", "Bienvenue"))
        .await
        .unwrap();

    let home = translations.load_namespace("en", "home").await.unwrap();
    assert_eq!(home.len(), 2);
    assert_eq!(home.get("title").map(String::as_str), Some("Welcome back"));
    assert_eq!(home.get("cta").map(String::as_str), Some("Shop now"));

    assert_eq!(translations.locales().await.unwrap(), vec!["en", "fr"]);

    let found = translations
        .find_by_key("fr", "home", "title")
        .await
        .unwrap()
        .unwrap();
    let updated = translations
        .update(
            &found.id,
            &UpdateTranslationInput {
                value: text("Salut"),
                ..UpdateTranslationInput::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.value, "Salut");
    assert!(updated.updated_at >= found.updated_at);
}

// =============================================================================
// Sliders
// =============================================================================

#[tokio::test]
async fn test_slider_round_trip_and_viewports() {
    let pool = store().await;
    let sliders = SliderRepository::new(&pool);

    let created = sliders
        .create(&CreateSliderInput {
            content: SlideContent {
                title: text("Summer sale"),
                image_url: text("https://cdn.example.com/summer.jpg"),
                ..SlideContent::default()
            },
            mobile: SlideContent {
                image_url: text("https://cdn.example.com/summer-tall.jpg"),
                ..SlideContent::default()
            },
            is_active: true,
            ..CreateSliderInput::default()
        })
        .await
        .unwrap();

    let found = sliders.get(&created.id).await.unwrap();
    assert_eq!(found, created);

    let mobile = found.content_for(Viewport::Mobile);
    assert_eq!(mobile.title.as_deref(), Some("Summer sale"));
    assert_eq!(
        mobile.image_url.as_deref(),
        Some("https://cdn.example.com/summer-tall.jpg")
    );
    let desktop = found.content_for(Viewport::Desktop);
    assert_eq!(
        desktop.image_url.as_deref(),
        Some("https://cdn.example.com/summer.jpg")
    );

    // Replacing the mobile block clears the fields it leaves out.
    let updated = sliders
        .update(
            &created.id,
            &UpdateSliderInput {
                mobile: Some(SlideContent {
                    title: text("Sale"),
                    ..SlideContent::default()
                }),
                ..UpdateSliderInput::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.mobile.title.as_deref(), Some("Sale"));
    assert!(updated.mobile.image_url.is_none());
    assert_eq!(updated.content, created.content);
}

#[tokio::test]
async fn test_slider_list_active_and_reorder() {
    let pool = store().await;
    let sliders = SliderRepository::new(&pool);

    let mut ids = Vec::new();
    for (title, active) in [("a", true), ("b", false), ("c", true)] {
        let slide = sliders
            .create(&CreateSliderInput {
                content: SlideContent {
                    title: text(title),
                    ..SlideContent::default()
                },
                is_active: active,
                ..CreateSliderInput::default()
            })
            .await
            .unwrap();
        ids.push(slide.id);
    }

    // Equal order falls back to id.
    let titles = |slides: Vec<catalog_store::models::Slider>| {
        slides
            .into_iter()
            .filter_map(|s| s.content.title)
            .collect::<Vec<_>>()
    };
    assert_eq!(titles(sliders.list_active().await.unwrap()), vec!["a", "c"]);

    let reversed: Vec<SliderId> = ids.iter().rev().copied().collect();
    sliders.reorder(&reversed).await.unwrap();
    assert_eq!(titles(sliders.list_active().await.unwrap()), vec!["c", "a"]);

    // An unknown id rolls the whole reorder back.
    let err = sliders
        .reorder(&[ids[0], SliderId::new(999)])
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(titles(sliders.list_active().await.unwrap()), vec!["c", "a"]);
}

// =============================================================================
// Announcement Bars
// =============================================================================

#[tokio::test]
async fn test_top_bar_list_active() {
    let pool = store().await;
    let top_bars = TopBarRepository::new(&pool);

    for (title, active, order) in [("second", true, 2), ("hidden", false, 0), ("first", true, 1)] {
        top_bars
            .create(&CreateTopBarInput {
                title: title.to_owned(),
                url: "/".to_owned(),
                icon: None,
                is_active: active,
                order,
            })
            .await
            .unwrap();
    }

    let active: Vec<String> = top_bars
        .list_active()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(active, vec!["first", "second"]);
}

#[tokio::test]
async fn test_top_bar_requires_title() {
    let pool = store().await;

    let err = TopBarRepository::new(&pool)
        .create(&CreateTopBarInput {
            title: String::new(),
            url: "/".to_owned(),
            icon: None,
            is_active: true,
            order: 0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Validation { .. }));
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_duplicate_setting_key_is_rejected() {
    let pool = store().await;
    let settings = SettingsRepository::new(&pool);

    settings
        .create(&CreateSettingInput::new("site_banner", "banner-1.jpg"))
        .await
        .unwrap();
    let err = settings
        .create(&CreateSettingInput::new("site_banner", "banner-2.jpg"))
        .await
        .unwrap_err();

    match err {
        RepositoryError::ConstraintViolation {
            entity,
            constraint,
            fields,
        } => {
            assert_eq!(entity, "Setting");
            assert_eq!(constraint, "settings_key_key");
            assert_eq!(fields, vec!["key".to_owned()]);
        }
        other => panic!("expected ConstraintViolation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_setting_set_upserts_by_key() {
    let pool = store().await;
    let settings = SettingsRepository::new(&pool);

    assert!(settings.get_value("site_banner").await.unwrap().is_none());

    let first = settings.set("site_banner", "one").await.unwrap();
    let second = settings.set("site_banner", "two").await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(
        settings.get_value("site_banner").await.unwrap().as_deref(),
        Some("two")
    );

    let by_key = settings.find_by_key("site_banner").await.unwrap().unwrap();
    assert_eq!(by_key.id, first.id);
}
