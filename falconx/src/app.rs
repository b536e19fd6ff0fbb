//! Application state and initialization
//!
//! This module wires the services together. Everything a command needs is
//! reachable from `AppState`; there is no global state.

use crate::config::AppConfig;
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::sync::LoadSource;
use crate::services::{
    AdminAuth, BackupService, CatalogService, GitHubClient, SettingsService, SyncCoordinator,
};
use crate::storage::SessionStore;
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub repo: Repository,
    pub sessions: SessionStore,
    pub settings_service: SettingsService,
    pub catalog: CatalogService,
    pub backup_service: BackupService,
    pub auth: Arc<AdminAuth<GitHubClient>>,
    pub sync: Arc<SyncCoordinator<GitHubClient>>,
    pub load_source: LoadSource,
}

/// Application setup - called once on startup
pub async fn setup(config: AppConfig) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("Data directory: {:?}", config.data_dir);

    std::fs::create_dir_all(&config.data_dir)?;
    std::fs::create_dir_all(config.exports_dir())?;

    let pool = create_pool(&config.db_path()).await?;
    let repo = Repository::new(pool);

    let settings_service = SettingsService::new(repo.clone());
    settings_service
        .seed_repository(config.default_owner.as_deref(), config.default_repo.as_deref())
        .await?;

    let catalog = CatalogService::new(repo.clone(), settings_service.clone());
    let backup_service = BackupService::new(catalog.clone(), config.exports_dir());
    let sessions = SessionStore::new();

    let github = Arc::new(GitHubClient::new(&config)?);
    let auth = Arc::new(AdminAuth::new(
        github.clone(),
        sessions.clone(),
        settings_service.clone(),
    ));
    let sync = Arc::new(SyncCoordinator::new(
        github,
        catalog.clone(),
        settings_service.clone(),
    ));

    let load_source = sync.initial_load().await?;
    tracing::info!("Catalog loaded from {:?}", load_source);

    Ok(AppState {
        config,
        repo,
        sessions,
        settings_service,
        catalog,
        backup_service,
        auth,
        sync,
        load_source,
    })
}
