//! Export and import commands

use crate::app::AppState;
use crate::error::Result;
use crate::services::backup::ExportRecord;
use std::path::{Path, PathBuf};

/// Export to `path`, or to a timestamped file in the exports directory
pub async fn export_catalog(state: &AppState, path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => {
            state.backup_service.export_to(path).await?;
            Ok(path.to_path_buf())
        }
        None => state.backup_service.create_export().await,
    }
}

/// Replace the catalog with an export file; returns the item count
pub async fn import_catalog(state: &AppState, path: &Path) -> Result<usize> {
    state.backup_service.import_from(path).await
}

pub async fn list_exports(state: &AppState) -> Result<Vec<ExportRecord>> {
    state.backup_service.list_exports().await
}
