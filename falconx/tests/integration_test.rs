//! Integration tests for FalconX
//!
//! These tests run the application setup against a temporary data directory
//! and exercise the commands end to end:
//! - Startup fallbacks (defaults, cache, unreachable GitHub)
//! - Catalog editing and persistence
//! - Preferences
//! - Export and import

use falconx::app::{setup, AppState};
use falconx::commands;
use falconx::config::AppConfig;
use falconx::database::CatalogType;
use falconx::error::AppError;
use falconx::services::settings::{Language, Theme};
use falconx::services::sync::{LoadSource, SkipReason, SyncOutcome};
use std::time::Duration;
use tempfile::TempDir;

fn test_config(temp: &TempDir) -> AppConfig {
    AppConfig {
        data_dir: temp.path().join("data"),
        // Nothing listens here; any request fails fast
        api_base: "http://127.0.0.1:9".to_string(),
        raw_base: "http://127.0.0.1:9".to_string(),
        http_timeout: Duration::from_secs(2),
        ..AppConfig::default()
    }
}

async fn create_test_app() -> (AppState, TempDir) {
    let temp = TempDir::new().unwrap();
    let state = setup(test_config(&temp)).await.unwrap();
    (state, temp)
}

const ITEM_JSON: &str = r#"{
    "name": "Falcon Player",
    "category": "Multimedia",
    "version": "3.1",
    "shortDesc": "Plays everything",
    "status": "Modified",
    "originalLink": "https://example.com/player.zip",
    "screenshots": ["https://example.com/shot.png"],
    "features": ["Fast"],
    "releaseChannel": "beta"
}"#;

#[tokio::test]
async fn test_fresh_start_uses_defaults() {
    let (state, _temp) = create_test_app().await;

    assert_eq!(state.load_source, LoadSource::Defaults);

    for catalog in CatalogType::ALL {
        let categories = commands::list_categories(&state, catalog).await;
        assert_eq!(categories.len(), catalog.default_categories().len());

        let (_, items) = commands::list_items(&state, Some(catalog), None, None)
            .await
            .unwrap();
        assert!(commands::render_grid(catalog, &items).contains("No items found"));
    }

    // Listing without a catalog reopens the last tab
    let (catalog, _) = commands::list_items(&state, None, None, None).await.unwrap();
    assert_eq!(catalog, CatalogType::FrpApps);
}

#[tokio::test]
async fn test_unreachable_repository_falls_back_to_defaults() {
    let temp = TempDir::new().unwrap();
    let config = AppConfig {
        default_owner: Some("falcon".to_string()),
        default_repo: Some("site".to_string()),
        ..test_config(&temp)
    };

    let state = setup(config).await.unwrap();
    assert_eq!(state.load_source, LoadSource::Defaults);

    let prefs = commands::get_preferences(&state).await.unwrap();
    assert_eq!(prefs.repository.as_deref(), Some("falcon/site"));

    match commands::sync_now(&state).await {
        SyncOutcome::Failed(_) => {}
        other => panic!("expected a failed sync, got {:?}", other),
    }
    // A failed pull leaves the defaults in place
    assert!(!commands::list_categories(&state, CatalogType::FrpApps).await.is_empty());
}

#[tokio::test]
async fn test_sync_without_repository_is_skipped() {
    let (state, _temp) = create_test_app().await;

    assert_eq!(
        commands::sync_now(&state).await,
        SyncOutcome::Skipped(SkipReason::NotConfigured)
    );
    assert_eq!(
        commands::check_for_updates(&state).await,
        SyncOutcome::Skipped(SkipReason::NotConfigured)
    );
    assert!(commands::sync_status(&state).await.is_some());
}

#[tokio::test]
async fn test_item_edits_survive_restart() {
    let temp = TempDir::new().unwrap();

    let id = {
        let state = setup(test_config(&temp)).await.unwrap();
        let item = commands::add_item(&state, CatalogType::WindowsPrograms, ITEM_JSON)
            .await
            .unwrap();
        assert!(item.id > 0);
        assert!(item.last_modified.is_some());

        commands::add_category(&state, CatalogType::WindowsPrograms, "Drivers")
            .await
            .unwrap();
        item.id
    };

    let state = setup(test_config(&temp)).await.unwrap();
    assert_eq!(state.load_source, LoadSource::Cache);

    let item = commands::show_item(&state, CatalogType::WindowsPrograms, id)
        .await
        .unwrap();
    assert_eq!(item.name, "Falcon Player");
    assert_eq!(item.extra.get("releaseChannel").unwrap(), "beta");

    let categories = commands::list_categories(&state, CatalogType::WindowsPrograms).await;
    assert!(categories.contains(&"Drivers".to_string()));
}

#[tokio::test]
async fn test_update_and_delete_item() {
    let (state, _temp) = create_test_app().await;

    let item = commands::add_item(&state, CatalogType::AndroidApps, ITEM_JSON)
        .await
        .unwrap();

    let updated = commands::update_item(
        &state,
        CatalogType::AndroidApps,
        item.id,
        r#"{"name":"Renamed","shortDesc":"Still plays"}"#,
    )
    .await
    .unwrap();
    assert_eq!(updated.id, item.id);
    assert_eq!(updated.name, "Renamed");

    let missing = commands::update_item(
        &state,
        CatalogType::AndroidApps,
        item.id + 1,
        r#"{"name":"Ghost","shortDesc":"x"}"#,
    )
    .await;
    assert!(matches!(missing, Err(AppError::ItemNotFound { .. })));

    assert!(commands::delete_item(&state, CatalogType::AndroidApps, item.id)
        .await
        .unwrap());
    assert!(!commands::delete_item(&state, CatalogType::AndroidApps, item.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_search_and_category_filter() {
    let (state, _temp) = create_test_app().await;

    commands::add_item(&state, CatalogType::WindowsGames, ITEM_JSON)
        .await
        .unwrap();
    commands::add_item(
        &state,
        CatalogType::WindowsGames,
        r#"{"name":"Road Rash","category":"Racing","shortDesc":"Bikes"}"#,
    )
    .await
    .unwrap();

    let (_, found) =
        commands::list_items(&state, Some(CatalogType::WindowsGames), Some("road"), None)
            .await
            .unwrap();
    assert_eq!(found.len(), 1);

    let (_, racing) =
        commands::list_items(&state, Some(CatalogType::WindowsGames), None, Some("Racing"))
            .await
            .unwrap();
    assert_eq!(racing.len(), 1);
    assert_eq!(racing[0].name, "Road Rash");

    // Listing remembers the tab
    let (tab, _) = commands::list_items(&state, None, None, None).await.unwrap();
    assert_eq!(tab, CatalogType::WindowsGames);
}

#[tokio::test]
async fn test_deep_link_opens_item() {
    let (state, _temp) = create_test_app().await;

    let item = commands::add_item(&state, CatalogType::PhoneTools, ITEM_JSON)
        .await
        .unwrap();

    let link = commands::share_link(&state, CatalogType::PhoneTools, item.id)
        .await
        .unwrap();
    let (parsed, opened) = commands::open_link(&state, &link).await.unwrap();
    assert_eq!(parsed.catalog, CatalogType::PhoneTools);
    assert_eq!(opened.unwrap().id, item.id);

    // Unknown item still opens the tab
    let (parsed, opened) = commands::open_link(&state, "?tab=frp-apps&item=1")
        .await
        .unwrap();
    assert_eq!(parsed.catalog, CatalogType::FrpApps);
    assert!(opened.is_none());
}

#[tokio::test]
async fn test_preferences_persist() {
    let temp = TempDir::new().unwrap();

    {
        let state = setup(test_config(&temp)).await.unwrap();
        commands::set_theme(&state, Theme::Dark).await.unwrap();
        commands::set_language(&state, Language::Ar).await.unwrap();
        commands::dismiss_warning(&state, "frp").await.unwrap();
        commands::set_repository(&state, "falcon", "site").await.unwrap();
    }

    let state = setup(test_config(&temp)).await.unwrap();
    let prefs = commands::get_preferences(&state).await.unwrap();
    assert_eq!(prefs.theme, Theme::Dark);
    assert_eq!(prefs.language, Language::Ar);
    assert_eq!(prefs.repository.as_deref(), Some("falcon/site"));
    assert!(!prefs.token_saved);

    assert_eq!(commands::reset_warnings(&state).await.unwrap(), 1);
}

#[tokio::test]
async fn test_export_import_roundtrip() {
    let (state, temp) = create_test_app().await;

    let item = commands::add_item(&state, CatalogType::FrpApps, ITEM_JSON)
        .await
        .unwrap();

    let path = temp.path().join("out").join("catalog.json");
    commands::export_catalog(&state, Some(&path)).await.unwrap();
    assert!(path.exists());

    commands::delete_item(&state, CatalogType::FrpApps, item.id)
        .await
        .unwrap();

    let count = commands::import_catalog(&state, &path).await.unwrap();
    assert_eq!(count, 1);
    assert!(commands::show_item(&state, CatalogType::FrpApps, item.id)
        .await
        .is_ok());

    let exported = commands::export_catalog(&state, None).await.unwrap();
    let exports = commands::list_exports(&state).await.unwrap();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].path, exported);
}

#[tokio::test]
async fn test_publish_requires_login() {
    let (state, _temp) = create_test_app().await;

    assert!(commands::admin_status(&state).await.is_none());

    let result = commands::publish(&state).await;
    assert!(matches!(result, Err(AppError::NotAuthenticated)));

    let info = commands::get_app_info(&state).await.unwrap();
    assert!(!info.admin);
    assert_eq!(info.total_items, 0);
}

#[tokio::test]
async fn test_login_rejects_malformed_token() {
    let (state, _temp) = create_test_app().await;

    let result = commands::login(&state, "not-a-token", None, Some("site".into()), false).await;
    let err = result.unwrap_err();
    assert!(matches!(err, AppError::InvalidToken(_)));

    let message = commands::login_error_message(&state, &err).await;
    assert!(message.contains("ghp_"));
}

#[tokio::test]
async fn test_token_check_needs_token_shape() {
    let (state, _temp) = create_test_app().await;

    let result = commands::check_token(&state, "").await;
    assert!(matches!(result, Err(AppError::InvalidToken(_))));

    // Well-formed token, GitHub unreachable
    let result = commands::check_token(&state, "ghp_abc").await;
    assert!(matches!(result, Err(AppError::Http(_))));
}
