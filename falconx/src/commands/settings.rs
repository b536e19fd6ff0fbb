//! Preference commands
//!
//! Theme, language, dismissed warnings and the repository the site reads.

use crate::app::AppState;
use crate::database::SettingsUpdate;
use crate::error::Result;
use crate::services::settings::{Language, Theme};
use serde::Serialize;

/// Preferences as shown to the user
#[derive(Debug, Clone, Serialize)]
pub struct Preferences {
    pub theme: Theme,
    pub language: Language,
    pub repository: Option<String>,
    pub token_saved: bool,
}

pub async fn get_preferences(state: &AppState) -> Result<Preferences> {
    let settings = state.settings_service.get_settings().await?;
    Ok(Preferences {
        theme: state.settings_service.get_theme().await?,
        language: state.settings_service.get_language().await?,
        repository: settings.repo_ref().map(|r| r.to_string()),
        token_saved: settings.token().is_some(),
    })
}

pub async fn set_theme(state: &AppState, theme: Theme) -> Result<()> {
    state.settings_service.set_theme(theme).await
}

pub async fn set_language(state: &AppState, language: Language) -> Result<()> {
    state.settings_service.set_language(language).await
}

pub async fn dismiss_warning(state: &AppState, name: &str) -> Result<()> {
    state.settings_service.dismiss_warning(name).await
}

/// Show every dismissed warning again; returns how many were reset
pub async fn reset_warnings(state: &AppState) -> Result<usize> {
    state.settings_service.reset_warnings().await
}

/// Point the site at a repository without logging in
pub async fn set_repository(state: &AppState, owner: &str, repo: &str) -> Result<()> {
    state
        .catalog
        .save_settings(SettingsUpdate {
            github_token: None,
            github_username: Some(owner.trim().to_string()),
            github_repo: Some(repo.trim().to_string()),
        })
        .await?;
    Ok(())
}
