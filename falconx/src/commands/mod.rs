//! Commands behind the CLI
//!
//! Each command takes the shared `AppState`, does one thing and returns
//! data; printing is left to `main.rs`.
//! - `catalog`: browsing and editing catalog items and categories
//! - `admin`: login, logout and publishing to GitHub
//! - `sync`: pulling the published catalog
//! - `settings`: theme, language and warning preferences
//! - `backup`: JSON export and import

pub mod admin;
pub mod backup;
pub mod catalog;
pub mod settings;
pub mod sync;

use crate::app::AppState;
use crate::error::Result;
use crate::services::sync::{LoadSource, SyncStatus};

pub use admin::*;
pub use backup::*;
pub use catalog::*;
pub use settings::*;
pub use sync::*;

/// Application information structure
#[derive(Debug, serde::Serialize)]
pub struct AppInfo {
    pub version: String,
    pub data_dir: String,
    pub repository: Option<String>,
    pub total_items: usize,
    pub cached_at: Option<chrono::DateTime<chrono::Utc>>,
    pub load_source: LoadSource,
    pub admin: bool,
    pub last_sync: Option<SyncStatus>,
}

/// Get application information
pub async fn get_app_info(state: &AppState) -> Result<AppInfo> {
    let settings = state.settings_service.get_settings().await?;

    Ok(AppInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        data_dir: state.config.data_dir.to_string_lossy().to_string(),
        repository: settings.repo_ref().map(|r| r.to_string()),
        total_items: state.catalog.snapshot().await.total_items(),
        cached_at: state.catalog.cached_at().await?,
        load_source: state.load_source,
        admin: state.auth.check_session(chrono::Utc::now()).await.is_some(),
        last_sync: state.sync.last_status().await,
    })
}
