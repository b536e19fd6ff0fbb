//! Catalog service
//!
//! The local store: catalog items and categories held in memory, with
//! explicit persistence to local storage. Mutations only touch memory;
//! callers decide when to `persist`.

use crate::config::{KEY_DATA, KEY_DATA_TIMESTAMP, SECRET_SETTINGS_KEYS};
use crate::database::{CatalogData, CatalogItem, CatalogType, Repository, Settings, SettingsUpdate};
use crate::error::{AppError, Result};
use crate::services::SettingsService;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Url;
use std::sync::Arc;
use tokio::sync::RwLock;

struct CatalogState {
    data: CatalogData,
    /// Last id handed out, keeps ids strictly increasing
    last_id: i64,
}

/// Service for catalog CRUD
#[derive(Clone)]
pub struct CatalogService {
    repo: Repository,
    settings: SettingsService,
    state: Arc<RwLock<CatalogState>>,
}

impl CatalogService {
    pub fn new(repo: Repository, settings: SettingsService) -> Self {
        Self {
            repo,
            settings,
            state: Arc::new(RwLock::new(CatalogState {
                data: CatalogData::default(),
                last_id: 0,
            })),
        }
    }

    /// Load the cached document from local storage.
    ///
    /// Returns `false` when there is no usable cache.
    pub async fn load_cached(&self) -> Result<bool> {
        match self.repo.get_json::<CatalogData>(KEY_DATA).await? {
            Some(data) => {
                tracing::info!("Loaded cached catalog ({} items)", data.total_items());
                self.replace(data).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write the in-memory document to local storage
    pub async fn persist(&self) -> Result<()> {
        let data = self.snapshot().await;
        self.repo.set_json(KEY_DATA, &data).await?;
        self.repo
            .set(KEY_DATA_TIMESTAMP, &Utc::now().timestamp_millis().to_string())
            .await?;

        tracing::debug!("Persisted catalog ({} items)", data.total_items());
        Ok(())
    }

    /// When the local cache was last written
    pub async fn cached_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .repo
            .get(KEY_DATA_TIMESTAMP)
            .await?
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()))
    }

    /// Replace the whole in-memory document
    pub async fn replace(&self, data: CatalogData) {
        let mut state = self.state.write().await;
        state.last_id = state.last_id.max(data.max_id());
        state.data = data;
    }

    /// Copy of the whole in-memory document
    pub async fn snapshot(&self) -> CatalogData {
        self.state.read().await.data.clone()
    }

    pub async fn get_items(&self, catalog: CatalogType) -> Vec<CatalogItem> {
        self.state.read().await.data.items(catalog).to_vec()
    }

    pub async fn find_item(&self, catalog: CatalogType, id: i64) -> Option<CatalogItem> {
        self.state
            .read()
            .await
            .data
            .items(catalog)
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    /// Case-insensitive search on name and short description,
    /// optionally restricted to one category
    pub async fn search_items(
        &self,
        catalog: CatalogType,
        query: Option<&str>,
        category: Option<&str>,
    ) -> Vec<CatalogItem> {
        let query = query.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty());
        let state = self.state.read().await;

        state
            .data
            .items(catalog)
            .iter()
            .filter(|item| category.map_or(true, |c| item.category == c))
            .filter(|item| {
                query.as_ref().map_or(true, |q| {
                    item.name.to_lowercase().contains(q)
                        || item.short_desc.to_lowercase().contains(q)
                })
            })
            .cloned()
            .collect()
    }

    /// Add an item, stamping a fresh id and `lastModified`
    pub async fn add_item(&self, catalog: CatalogType, mut item: CatalogItem) -> CatalogItem {
        let now = Utc::now();
        let mut state = self.state.write().await;

        let id = now.timestamp_millis().max(state.last_id.saturating_add(1));
        state.last_id = id;

        item.id = id;
        item.last_modified = Some(now);
        state.data.items_mut(catalog).push(item.clone());

        tracing::info!("Added {} item {}: {}", catalog, id, item.name);
        item
    }

    /// Replace an item's fields, keeping its id
    pub async fn update_item(
        &self,
        catalog: CatalogType,
        id: i64,
        mut item: CatalogItem,
    ) -> Result<CatalogItem> {
        let mut state = self.state.write().await;

        let slot = state
            .data
            .items_mut(catalog)
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::ItemNotFound {
                catalog: catalog.to_string(),
                id,
            })?;

        item.id = id;
        item.last_modified = Some(Utc::now());
        *slot = item.clone();

        tracing::info!("Updated {} item {}", catalog, id);
        Ok(item)
    }

    /// Remove an item; unknown ids are ignored.
    ///
    /// Returns whether anything was removed.
    pub async fn delete_item(&self, catalog: CatalogType, id: i64) -> bool {
        let mut state = self.state.write().await;
        let items = state.data.items_mut(catalog);
        let before = items.len();
        items.retain(|i| i.id != id);

        let removed = items.len() != before;
        if removed {
            tracing::info!("Deleted {} item {}", catalog, id);
        }
        removed
    }

    pub async fn get_categories(&self, catalog: CatalogType) -> Vec<String> {
        self.state.read().await.data.categories(catalog).to_vec()
    }

    /// Add a category; returns `false` if it already exists
    pub async fn add_category(&self, catalog: CatalogType, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Category name is empty".to_string()));
        }

        let mut state = self.state.write().await;
        let categories = state.data.categories_mut(catalog);
        if categories.iter().any(|c| c == name) {
            return Ok(false);
        }

        categories.push(name.to_string());
        tracing::info!("Added {} category: {}", catalog, name);
        Ok(true)
    }

    /// Remove a category name. Items referencing it keep the string.
    pub async fn delete_category(&self, catalog: CatalogType, name: &str) -> bool {
        let mut state = self.state.write().await;
        let categories = state.data.categories_mut(catalog);
        let before = categories.len();
        categories.retain(|c| c != name);
        categories.len() != before
    }

    pub async fn get_settings(&self) -> Result<Settings> {
        self.settings.get_settings().await
    }

    pub async fn save_settings(&self, update: SettingsUpdate) -> Result<Settings> {
        self.settings.save_settings(update).await
    }

    /// Serialize the document for download, without secret settings
    pub async fn export_data(&self) -> Result<String> {
        let data = strip_secrets(self.snapshot().await);
        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Replace the whole document with an imported one
    pub async fn import_data(&self, json: &str) -> Result<()> {
        let data: CatalogData = serde_json::from_str(json)
            .map_err(|e| AppError::Validation(format!("Invalid catalog file: {}", e)))?;

        tracing::info!("Importing catalog ({} items)", data.total_items());
        self.replace(data).await;
        Ok(())
    }
}

/// Drop local-only settings fields before a document leaves the machine
pub fn strip_secrets(mut data: CatalogData) -> CatalogData {
    if let Some(settings) = data.settings.as_mut() {
        for key in SECRET_SETTINGS_KEYS {
            settings.remove(*key);
        }
        if settings.is_empty() {
            data.settings = None;
        }
    }
    data
}

/// Check the fields an admin form would reject
pub fn validate_item(item: &CatalogItem) -> Result<()> {
    if item.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if item.short_desc.trim().is_empty() {
        return Err(AppError::Validation("Short description is required".to_string()));
    }

    let links = [
        ("icon", &item.icon),
        ("originalLink", &item.original_link),
        ("modifiedLink", &item.modified_link),
        ("website", &item.website),
        ("directLink", &item.direct_link),
    ];

    for (field, value) in links {
        if let Some(url) = value.as_deref().filter(|u| !u.trim().is_empty()) {
            check_url(field, url)?;
        }
    }

    for url in &item.screenshots {
        check_url("screenshots", url)?;
    }

    Ok(())
}

fn check_url(field: &str, value: &str) -> Result<()> {
    match Url::parse(value.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(AppError::Validation(format!(
            "{} is not a valid http(s) URL: {}",
            field, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_memory_pool;
    use serde_json::{Map, Value};

    async fn create_test_service() -> CatalogService {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        let settings = SettingsService::new(repo.clone());
        CatalogService::new(repo, settings)
    }

    fn item(name: &str, category: &str) -> CatalogItem {
        CatalogItem {
            name: name.to_string(),
            category: category.to_string(),
            short_desc: format!("{} description", name),
            ..CatalogItem::default()
        }
    }

    #[tokio::test]
    async fn test_add_assigns_increasing_ids() {
        let service = create_test_service().await;

        let before = Utc::now();
        let first = service.add_item(CatalogType::WindowsPrograms, item("A", "Utilities")).await;
        let second = service.add_item(CatalogType::WindowsPrograms, item("B", "Utilities")).await;
        let third = service.add_item(CatalogType::AndroidApps, item("C", "Tools")).await;
        let after = Utc::now();

        assert!(first.id < second.id);
        assert!(second.id < third.id);

        let stamped = first.last_modified.unwrap();
        assert!(stamped >= before && stamped <= after);
        assert_eq!(first.id, stamped.timestamp_millis());

        assert_eq!(service.get_items(CatalogType::WindowsPrograms).await.len(), 2);
    }

    #[tokio::test]
    async fn test_ids_continue_after_loaded_document() {
        let service = create_test_service().await;

        let mut data = CatalogData::default();
        let mut future = item("Future", "x");
        future.id = Utc::now().timestamp_millis() + 60_000;
        data.phone_tools.push(future.clone());
        service.replace(data).await;

        let added = service.add_item(CatalogType::PhoneTools, item("Next", "x")).await;
        assert!(added.id > future.id);
    }

    #[tokio::test]
    async fn test_ids_after_max_id_document() {
        let service = create_test_service().await;

        let mut data = CatalogData::default();
        let mut last = item("Last", "x");
        last.id = i64::MAX;
        data.frp_apps.push(last);
        service.replace(data).await;

        let added = service.add_item(CatalogType::FrpApps, item("Next", "x")).await;
        assert_eq!(added.id, i64::MAX);
    }

    #[tokio::test]
    async fn test_update_preserves_id_and_refreshes_timestamp() {
        let service = create_test_service().await;

        let original = service.add_item(CatalogType::AndroidGames, item("Game", "Action")).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let mut changed = item("Game 2", "Racing");
        changed.id = 42;
        let updated = service
            .update_item(CatalogType::AndroidGames, original.id, changed)
            .await
            .unwrap();

        assert_eq!(updated.id, original.id);
        assert!(updated.last_modified.unwrap() > original.last_modified.unwrap());

        let stored = service.find_item(CatalogType::AndroidGames, original.id).await.unwrap();
        assert_eq!(stored.name, "Game 2");
        assert_eq!(stored.category, "Racing");
    }

    #[tokio::test]
    async fn test_update_unknown_item_fails() {
        let service = create_test_service().await;

        let result = service.update_item(CatalogType::FrpApps, 7, item("X", "y")).await;
        assert!(matches!(result, Err(AppError::ItemNotFound { id: 7, .. })));
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_noop() {
        let service = create_test_service().await;

        let kept = service.add_item(CatalogType::WindowsGames, item("Keep", "Action")).await;

        assert!(!service.delete_item(CatalogType::WindowsGames, kept.id + 1000).await);
        assert_eq!(service.get_items(CatalogType::WindowsGames).await.len(), 1);

        assert!(service.delete_item(CatalogType::WindowsGames, kept.id).await);
        assert!(service.get_items(CatalogType::WindowsGames).await.is_empty());
    }

    #[tokio::test]
    async fn test_category_uniqueness_and_orphans() {
        let service = create_test_service().await;

        assert!(service.add_category(CatalogType::AndroidApps, "Tools").await.unwrap());
        assert!(!service.add_category(CatalogType::AndroidApps, "Tools").await.unwrap());
        assert!(service.add_category(CatalogType::AndroidGames, "Tools").await.unwrap());
        assert!(service.add_category(CatalogType::AndroidApps, "  ").await.is_err());

        assert_eq!(service.get_categories(CatalogType::AndroidApps).await, vec!["Tools"]);

        let added = service.add_item(CatalogType::AndroidApps, item("App", "Tools")).await;
        assert!(service.delete_category(CatalogType::AndroidApps, "Tools").await);
        assert!(service.get_categories(CatalogType::AndroidApps).await.is_empty());

        let orphan = service.find_item(CatalogType::AndroidApps, added.id).await.unwrap();
        assert_eq!(orphan.category, "Tools");
    }

    #[tokio::test]
    async fn test_search_items() {
        let service = create_test_service().await;

        service.add_item(CatalogType::WindowsPrograms, item("VLC Player", "Multimedia")).await;
        service.add_item(CatalogType::WindowsPrograms, item("7-Zip", "Utilities")).await;
        let mut notes = item("Notepad", "Utilities");
        notes.short_desc = "Plain text player-free editor".to_string();
        service.add_item(CatalogType::WindowsPrograms, notes).await;

        let by_name = service
            .search_items(CatalogType::WindowsPrograms, Some("vlc"), None)
            .await;
        assert_eq!(by_name.len(), 1);

        let by_desc = service
            .search_items(CatalogType::WindowsPrograms, Some("PLAYER"), None)
            .await;
        assert_eq!(by_desc.len(), 2);

        let filtered = service
            .search_items(CatalogType::WindowsPrograms, Some("player"), Some("Utilities"))
            .await;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Notepad");

        let all = service.search_items(CatalogType::WindowsPrograms, Some("  "), None).await;
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_export_import_round_trip_without_secrets() {
        let service = create_test_service().await;

        service.add_item(CatalogType::FrpApps, item("Bypass", "Samsung")).await;
        service.add_category(CatalogType::FrpApps, "Samsung").await.unwrap();

        let mut data = service.snapshot().await;
        let mut settings = Map::new();
        settings.insert("githubToken".to_string(), Value::from("ghp_secret"));
        settings.insert("siteTitle".to_string(), Value::from("Falcon X"));
        data.settings = Some(settings);
        service.replace(data.clone()).await;

        let exported = service.export_data().await.unwrap();
        assert!(!exported.contains("ghp_secret"));

        let other = create_test_service().await;
        other.import_data(&exported).await.unwrap();

        let imported = other.snapshot().await;
        assert_eq!(imported.frp_apps, data.frp_apps);
        assert_eq!(imported.categories, data.categories);
        let imported_settings = imported.settings.unwrap();
        assert_eq!(imported_settings.get("siteTitle"), Some(&Value::from("Falcon X")));
        assert!(imported_settings.get("githubToken").is_none());
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_file() {
        let service = create_test_service().await;
        service.add_item(CatalogType::PhoneTools, item("Keep", "x")).await;

        assert!(service.import_data("[1, 2, 3]").await.is_err());
        assert_eq!(service.get_items(CatalogType::PhoneTools).await.len(), 1);
    }

    #[tokio::test]
    async fn test_persist_and_reload() {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        let settings = SettingsService::new(repo.clone());
        let service = CatalogService::new(repo.clone(), settings.clone());

        assert!(!service.load_cached().await.unwrap());
        assert!(service.cached_at().await.unwrap().is_none());

        service.add_item(CatalogType::AndroidApps, item("Cached", "Tools")).await;
        service.persist().await.unwrap();
        assert!(service.cached_at().await.unwrap().is_some());

        let reloaded = CatalogService::new(repo, settings);
        assert!(reloaded.load_cached().await.unwrap());
        assert_eq!(reloaded.get_items(CatalogType::AndroidApps).await[0].name, "Cached");
    }

    #[test]
    fn test_strip_secrets_drops_empty_settings() {
        let mut data = CatalogData::default();
        let mut settings = Map::new();
        settings.insert("githubToken".to_string(), Value::from("ghp_x"));
        settings.insert("githubRepo".to_string(), Value::from("site"));
        data.settings = Some(settings);

        assert!(strip_secrets(data).settings.is_none());
    }

    #[test]
    fn test_validate_item_urls() {
        let mut valid = item("Tool", "Utilities");
        valid.website = Some("https://example.com".to_string());
        valid.screenshots = vec!["http://cdn.example.com/1.png".to_string()];
        valid.icon = Some(String::new());
        assert!(validate_item(&valid).is_ok());

        let mut bad_link = valid.clone();
        bad_link.original_link = Some("ftp://example.com/file".to_string());
        assert!(validate_item(&bad_link).is_err());

        let mut bad_shot = valid.clone();
        bad_shot.screenshots.push("not a url".to_string());
        assert!(validate_item(&bad_shot).is_err());

        let mut unnamed = valid;
        unnamed.name = " ".to_string();
        assert!(validate_item(&unnamed).is_err());
    }
}
