//! Settings service
//!
//! GitHub settings and display preferences, persisted in local storage.
//! Settings never leave the machine; the sync layer strips them from
//! anything written to the repository.

use crate::config::{KEY_LANGUAGE, KEY_SETTINGS, KEY_THEME, KEY_WARNING_PREFIX};
use crate::database::{Repository, Settings, SettingsUpdate};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Colour scheme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("Unknown theme '{}'. Use 'light' or 'dark'", other)),
        }
    }
}

/// Interface language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "ar" => Ok(Language::Ar),
            other => Err(format!("Unknown language '{}'. Use 'en' or 'ar'", other)),
        }
    }
}

/// Service for settings and preferences
#[derive(Clone)]
pub struct SettingsService {
    repo: Repository,
}

impl SettingsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Load GitHub settings, empty when nothing was saved yet
    pub async fn get_settings(&self) -> Result<Settings> {
        Ok(self
            .repo
            .get_json::<Settings>(KEY_SETTINGS)
            .await?
            .unwrap_or_default())
    }

    /// Shallow-merge an update into the stored settings
    pub async fn save_settings(&self, update: SettingsUpdate) -> Result<Settings> {
        let mut settings = self.get_settings().await?;
        settings.apply(update);
        self.repo.set_json(KEY_SETTINGS, &settings).await?;

        tracing::info!(
            "Settings saved (repository: {}/{}, token stored: {})",
            settings.github_username,
            settings.github_repo,
            settings.token().is_some()
        );

        Ok(settings)
    }

    /// Fill in owner/repo from configuration when none are stored
    pub async fn seed_repository(&self, owner: Option<&str>, repo: Option<&str>) -> Result<()> {
        let settings = self.get_settings().await?;
        if settings.repo_ref().is_some() {
            return Ok(());
        }

        if let (Some(owner), Some(repo)) = (owner, repo) {
            tracing::info!("Seeding repository settings with {}/{}", owner, repo);
            self.save_settings(SettingsUpdate {
                github_username: Some(owner.to_string()),
                github_repo: Some(repo.to_string()),
                ..SettingsUpdate::default()
            })
            .await?;
        }

        Ok(())
    }

    /// Forget the remembered token, keeping the repository
    pub async fn forget_token(&self) -> Result<()> {
        self.save_settings(SettingsUpdate {
            github_token: Some(String::new()),
            ..SettingsUpdate::default()
        })
        .await?;
        Ok(())
    }

    pub async fn get_theme(&self) -> Result<Theme> {
        Ok(self
            .repo
            .get(KEY_THEME)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or_default())
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.repo.set(KEY_THEME, theme.as_str()).await
    }

    pub async fn get_language(&self) -> Result<Language> {
        Ok(self
            .repo
            .get(KEY_LANGUAGE)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or_default())
    }

    pub async fn set_language(&self, language: Language) -> Result<()> {
        self.repo.set(KEY_LANGUAGE, language.as_str()).await
    }

    /// Remember that a warning banner was dismissed
    pub async fn dismiss_warning(&self, name: &str) -> Result<()> {
        self.repo
            .set(&format!("{}{}", KEY_WARNING_PREFIX, name), "true")
            .await
    }

    pub async fn is_warning_dismissed(&self, name: &str) -> Result<bool> {
        Ok(self
            .repo
            .get(&format!("{}{}", KEY_WARNING_PREFIX, name))
            .await?
            .is_some_and(|v| v == "true"))
    }

    /// Show every dismissed warning again
    pub async fn reset_warnings(&self) -> Result<usize> {
        let keys = self.repo.keys_with_prefix(KEY_WARNING_PREFIX).await?;
        for key in &keys {
            self.repo.remove(key).await?;
        }
        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_memory_pool;

    async fn create_test_service() -> SettingsService {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        SettingsService::new(repo)
    }

    #[tokio::test]
    async fn test_default_settings_are_empty() {
        let service = create_test_service().await;

        let settings = service.get_settings().await.unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.repo_ref().is_none());
    }

    #[tokio::test]
    async fn test_save_settings_merges() {
        let service = create_test_service().await;

        service
            .save_settings(SettingsUpdate {
                github_token: Some("ghp_token".to_string()),
                ..SettingsUpdate::default()
            })
            .await
            .unwrap();

        service
            .save_settings(SettingsUpdate {
                github_username: Some("falcon".to_string()),
                github_repo: Some("catalog".to_string()),
                ..SettingsUpdate::default()
            })
            .await
            .unwrap();

        let settings = service.get_settings().await.unwrap();
        assert_eq!(settings.github_token, "ghp_token");
        assert_eq!(settings.github_username, "falcon");
        assert_eq!(settings.github_repo, "catalog");
    }

    #[tokio::test]
    async fn test_seed_does_not_override_existing_repository() {
        let service = create_test_service().await;

        service.seed_repository(Some("seed"), Some("site")).await.unwrap();
        service.seed_repository(Some("other"), Some("repo")).await.unwrap();

        let settings = service.get_settings().await.unwrap();
        assert_eq!(settings.github_username, "seed");
        assert_eq!(settings.github_repo, "site");

        service.forget_token().await.unwrap();
        assert!(service.get_settings().await.unwrap().token().is_none());
    }

    #[tokio::test]
    async fn test_preferences() {
        let service = create_test_service().await;

        assert_eq!(service.get_theme().await.unwrap(), Theme::Light);
        assert_eq!(service.get_language().await.unwrap(), Language::En);

        service.set_theme(Theme::Dark).await.unwrap();
        service.set_language(Language::Ar).await.unwrap();

        assert_eq!(service.get_theme().await.unwrap(), Theme::Dark);
        assert_eq!(service.get_language().await.unwrap(), Language::Ar);
    }

    #[tokio::test]
    async fn test_warning_dismissal() {
        let service = create_test_service().await;

        assert!(!service.is_warning_dismissed("frp").await.unwrap());
        service.dismiss_warning("frp").await.unwrap();
        service.dismiss_warning("modified").await.unwrap();
        assert!(service.is_warning_dismissed("frp").await.unwrap());

        assert_eq!(service.reset_warnings().await.unwrap(), 2);
        assert!(!service.is_warning_dismissed("frp").await.unwrap());
    }
}
