//! Admin commands
//!
//! The two-step GitHub login, session status and "Save to GitHub".

use crate::app::AppState;
use crate::database::{RepoRef, Session, Settings};
use crate::error::{AppError, Result};
use crate::services::auth::{localized_message, RepoChoice};
use crate::services::sync::PublishReceipt;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Session details safe to print
#[derive(Debug, Clone, Serialize)]
pub struct AdminStatus {
    pub repo: String,
    pub login_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for AdminStatus {
    fn from(session: &Session) -> Self {
        Self {
            repo: session.repo.to_string(),
            login_time: session.login_time,
            expires_at: session.expires_at(),
        }
    }
}

/// Check a token and list the repositories it can reach
pub async fn check_token(state: &AppState, token: &str) -> Result<RepoChoice> {
    state.auth.submit_token(token).await
}

/// Full login. The owner defaults to the token's user and the repository
/// name to the saved one.
pub async fn login(
    state: &AppState,
    token: &str,
    owner: Option<String>,
    repo: Option<String>,
    remember: bool,
) -> Result<AdminStatus> {
    let choice = state.auth.submit_token(token).await?;

    let saved = state.settings_service.get_settings().await?;
    let repo = resolve_repository(owner, repo, choice.owner, saved)?;

    let session = state.auth.submit_repo(repo, remember).await?;
    Ok(AdminStatus::from(&session))
}

/// Fill the repository form from flags, the token's login and saved settings
fn resolve_repository(
    owner: Option<String>,
    repo: Option<String>,
    login: String,
    saved: Settings,
) -> Result<RepoRef> {
    let name = repo
        .or(Some(saved.github_repo))
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| {
            AppError::Validation("Repository owner and name are required".to_string())
        })?;
    let owner = owner.unwrap_or(login);

    Ok(RepoRef::new(owner, name))
}

/// End the session; `forget` also drops the remembered token
pub async fn logout(state: &AppState, forget: bool) -> Result<()> {
    state.auth.logout().await;
    if forget {
        state.settings_service.forget_token().await?;
    }
    Ok(())
}

/// Current session, if any
pub async fn admin_status(state: &AppState) -> Option<AdminStatus> {
    state
        .auth
        .check_session(Utc::now())
        .await
        .map(|s| AdminStatus::from(&s))
}

/// Write the catalog to GitHub, signing in with the remembered token when
/// no session is open
pub async fn publish(state: &AppState) -> Result<PublishReceipt> {
    let session = match state.auth.require_session().await {
        Ok(session) => session,
        Err(AppError::NotAuthenticated) | Err(AppError::SessionExpired) => {
            state.auth.login_with_saved().await?
        }
        Err(e) => return Err(e),
    };

    state.sync.publish(&session).await
}

/// Login failure text in the chosen language
pub async fn login_error_message(state: &AppState, err: &AppError) -> String {
    let language = state.settings_service.get_language().await.unwrap_or_default();
    localized_message(err, language)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(repo: &str) -> Settings {
        Settings {
            github_repo: repo.to_string(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_repository_falls_back_to_saved_name() {
        let repo = resolve_repository(None, None, "falcon".into(), saved("site")).unwrap();
        assert_eq!(repo, RepoRef::new("falcon", "site"));
    }

    #[test]
    fn test_repository_flags_win() {
        let repo = resolve_repository(
            Some("org".into()),
            Some("catalog".into()),
            "falcon".into(),
            saved("site"),
        )
        .unwrap();
        assert_eq!(repo, RepoRef::new("org", "catalog"));
    }

    #[test]
    fn test_repository_required() {
        let result = resolve_repository(None, None, "falcon".into(), saved(""));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
