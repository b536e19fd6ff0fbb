//! Admin authentication
//!
//! Two-step login against GitHub:
//! 1. a personal access token is shape-checked and confirmed via `/user`,
//!    which also lists the user's repositories;
//! 2. the chosen repository is confirmed with the same token and a
//!    24 hour session is stored in session storage.
//!
//! `TokenForm -> RepoForm -> Authenticated -> (24h) -> TokenForm`

use crate::config::{SESSION_KEY_ADMIN, TOKEN_PREFIXES};
use crate::database::{RepoRef, Session, SettingsUpdate};
use crate::error::{AppError, Result};
use crate::services::github::{GitHubRepo, GitHubUser};
use crate::services::remote::AccountApi;
use crate::services::settings::Language;
use crate::services::SettingsService;
use crate::storage::SessionStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Login state. The token is only held between the two steps.
#[derive(Debug, Clone)]
pub enum AuthState {
    TokenForm,
    RepoForm { token: String, user: GitHubUser },
    Authenticated(Session),
}

/// Which form is showing, without secrets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthStep {
    TokenForm,
    RepoForm,
    Authenticated,
}

/// Data for the repository form after a valid token
#[derive(Debug, Clone, Serialize)]
pub struct RepoChoice {
    pub login: String,
    /// Pre-filled owner field
    pub owner: String,
    pub repos: Vec<GitHubRepo>,
}

/// Reject tokens that cannot be GitHub personal access tokens
pub fn validate_token_shape(token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::InvalidToken("Token is empty".to_string()));
    }
    if !TOKEN_PREFIXES.iter().any(|p| token.starts_with(p)) {
        return Err(AppError::InvalidToken(format!(
            "Token must start with {}",
            TOKEN_PREFIXES.join(" or ")
        )));
    }
    Ok(())
}

pub struct AdminAuth<A> {
    api: Arc<A>,
    sessions: SessionStore,
    settings: SettingsService,
    state: RwLock<AuthState>,
}

impl<A: AccountApi> AdminAuth<A> {
    pub fn new(api: Arc<A>, sessions: SessionStore, settings: SettingsService) -> Self {
        Self {
            api,
            sessions,
            settings,
            state: RwLock::new(AuthState::TokenForm),
        }
    }

    pub async fn step(&self) -> AuthStep {
        match &*self.state.read().await {
            AuthState::TokenForm => AuthStep::TokenForm,
            AuthState::RepoForm { .. } => AuthStep::RepoForm,
            AuthState::Authenticated(_) => AuthStep::Authenticated,
        }
    }

    /// Step 1: confirm the token and list repositories
    pub async fn submit_token(&self, token: &str) -> Result<RepoChoice> {
        validate_token_shape(token)?;
        let token = token.trim().to_string();

        let user = self.api.current_user(&token).await?;

        let repos = match self.api.user_repos(&token).await {
            Ok(repos) => repos,
            Err(e) => {
                tracing::warn!("Could not list repositories for {}: {}", user.login, e);
                Vec::new()
            }
        };

        let choice = RepoChoice {
            login: user.login.clone(),
            owner: user.login.clone(),
            repos,
        };

        *self.state.write().await = AuthState::RepoForm { token, user };
        tracing::info!("Token accepted for {}", choice.login);
        Ok(choice)
    }

    /// Step 2: confirm the repository and open a session
    pub async fn submit_repo(&self, repo: RepoRef, remember: bool) -> Result<Session> {
        let token = match &*self.state.read().await {
            AuthState::RepoForm { token, .. } => token.clone(),
            _ => {
                return Err(AppError::Generic(
                    "Submit a token before choosing a repository".to_string(),
                ))
            }
        };

        if repo.owner.trim().is_empty() || repo.name.trim().is_empty() {
            return Err(AppError::Validation(
                "Repository owner and name are required".to_string(),
            ));
        }

        let confirmed = self.api.repository(&token, &repo).await?;

        let session = Session::new(token, confirmed.repo_ref(), Utc::now());
        self.sessions.set_json(SESSION_KEY_ADMIN, &session).await?;

        if remember {
            self.settings
                .save_settings(SettingsUpdate {
                    github_token: Some(session.token.clone()),
                    github_username: Some(session.repo.owner.clone()),
                    github_repo: Some(session.repo.name.clone()),
                })
                .await?;
        }

        *self.state.write().await = AuthState::Authenticated(session.clone());
        tracing::info!("Admin session opened for {}", session.repo);
        Ok(session)
    }

    /// Return to the token form, discarding the held token
    pub async fn back_to_token(&self) {
        *self.state.write().await = AuthState::TokenForm;
    }

    /// Look up the stored session, clearing it once it is past its lifetime
    pub async fn check_session(&self, now: DateTime<Utc>) -> Option<Session> {
        let session: Session = self.sessions.get_json(SESSION_KEY_ADMIN).await?;

        if session.is_valid_at(now) {
            *self.state.write().await = AuthState::Authenticated(session.clone());
            return Some(session);
        }

        tracing::info!("Admin session expired at {}", session.expires_at());
        self.sessions.remove(SESSION_KEY_ADMIN).await;
        *self.state.write().await = AuthState::TokenForm;
        None
    }

    /// Valid session or the reason there is none
    pub async fn require_session(&self) -> Result<Session> {
        let had_session = self.sessions.get(SESSION_KEY_ADMIN).await.is_some();
        match self.check_session(Utc::now()).await {
            Some(session) => Ok(session),
            None if had_session => Err(AppError::SessionExpired),
            None => Err(AppError::NotAuthenticated),
        }
    }

    /// Run both steps with the token and repository saved by "remember me"
    pub async fn login_with_saved(&self) -> Result<Session> {
        let settings = self.settings.get_settings().await?;
        let token = settings.token().ok_or(AppError::NotAuthenticated)?.to_string();
        let repo = settings.repo_ref().ok_or(AppError::NotConfigured)?;

        self.submit_token(&token).await?;
        self.submit_repo(repo, false).await
    }

    pub async fn logout(&self) {
        self.sessions.remove(SESSION_KEY_ADMIN).await;
        *self.state.write().await = AuthState::TokenForm;
        tracing::info!("Admin session closed");
    }
}

/// Inline form message for a login failure
pub fn localized_message(err: &AppError, language: Language) -> String {
    match (err, language) {
        (AppError::InvalidToken(_), Language::En) => {
            "Invalid token. Use a GitHub personal access token (ghp_… or github_pat_…).".to_string()
        }
        (AppError::InvalidToken(_), Language::Ar) => {
            "رمز غير صالح. استخدم رمز وصول شخصي من GitHub (ghp_… أو github_pat_…).".to_string()
        }
        (AppError::NotFound(_), Language::En) => {
            "Repository not found or not accessible with this token.".to_string()
        }
        (AppError::NotFound(_), Language::Ar) => {
            "المستودع غير موجود أو لا يمكن الوصول إليه بهذا الرمز.".to_string()
        }
        (AppError::SessionExpired, Language::En) => {
            "Your session has expired. Please sign in again.".to_string()
        }
        (AppError::SessionExpired, Language::Ar) => {
            "انتهت صلاحية الجلسة. يرجى تسجيل الدخول مرة أخرى.".to_string()
        }
        (AppError::Validation(_), Language::En) => "Please fill in all fields.".to_string(),
        (AppError::Validation(_), Language::Ar) => "يرجى ملء جميع الحقول.".to_string(),
        (AppError::RateLimited { .. }, Language::Ar) => {
            format!("تم تجاوز حد طلبات GitHub. {}", err)
        }
        (AppError::Http(_), Language::En) => {
            "Could not reach GitHub. Check your connection.".to_string()
        }
        (AppError::Http(_), Language::Ar) => {
            "تعذر الاتصال بـ GitHub. تحقق من اتصالك.".to_string()
        }
        _ => err.to_string(),
    }
}
