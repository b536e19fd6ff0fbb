//! Export/import service
//!
//! Writes the catalog (minus local secrets) to timestamped JSON files and
//! restores the catalog from such a file. Old exports are pruned.

use crate::error::{AppError, Result};
use crate::services::CatalogService;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

const DEFAULT_RETENTION_COUNT: usize = 10;
const EXPORT_PREFIX: &str = "falconx-export_";

/// Export file on disk
#[derive(Debug, Clone, Serialize)]
pub struct ExportRecord {
    pub path: PathBuf,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct BackupService {
    catalog: CatalogService,
    exports_dir: PathBuf,
    retention_count: usize,
}

impl BackupService {
    pub fn new(catalog: CatalogService, exports_dir: PathBuf) -> Self {
        Self {
            catalog,
            exports_dir,
            retention_count: DEFAULT_RETENTION_COUNT,
        }
    }

    pub fn with_retention(mut self, retention_count: usize) -> Self {
        self.retention_count = retention_count.max(1);
        self
    }

    /// Export into the exports directory under a timestamped name
    pub async fn create_export(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.exports_dir).await?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let path = self
            .exports_dir
            .join(format!("{}{}.json", EXPORT_PREFIX, timestamp));

        self.export_to(&path).await?;
        self.apply_retention_policy().await?;
        Ok(path)
    }

    /// Export to an explicit path
    pub async fn export_to(&self, path: &Path) -> Result<()> {
        let json = self.catalog.export_data().await?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &json).await?;
        fs::rename(&temp_path, path).await?;

        tracing::info!("Catalog exported to {:?} ({} bytes)", path, json.len());
        Ok(())
    }

    /// Replace the catalog with the contents of an export file
    pub async fn import_from(&self, path: &Path) -> Result<usize> {
        tracing::info!("Importing catalog from {:?}", path);

        if !fs::try_exists(path).await? {
            return Err(AppError::NotFound(format!("{}", path.display())));
        }

        let json = fs::read_to_string(path).await?;
        self.catalog.import_data(&json).await?;
        self.catalog.persist().await?;

        Ok(self.catalog.snapshot().await.total_items())
    }

    /// Exports in the exports directory, newest first
    pub async fn list_exports(&self) -> Result<Vec<ExportRecord>> {
        if !fs::try_exists(&self.exports_dir).await? {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.exports_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(EXPORT_PREFIX) || !name.ends_with(".json") {
                continue;
            }

            let metadata = entry.metadata().await?;
            let created_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            records.push(ExportRecord {
                path: entry.path(),
                size: metadata.len(),
                created_at,
            });
        }

        // Names embed the timestamp, so they sort chronologically
        records.sort_by(|a, b| b.path.cmp(&a.path));
        Ok(records)
    }

    /// Keep only the newest exports
    async fn apply_retention_policy(&self) -> Result<()> {
        let exports = self.list_exports().await?;

        for old in exports.iter().skip(self.retention_count) {
            tracing::info!("Deleting old export: {:?}", old.path);
            if let Err(e) = fs::remove_file(&old.path).await {
                tracing::warn!("Failed to delete export {:?}: {}", old.path, e);
            }
        }

        Ok(())
    }
}
