//! Sync coordinator
//!
//! Pulls the published catalog into the local store and pushes admin edits
//! back to the repository.
//!
//! Automatic pulls come from three triggers: startup, a 30 minute interval
//! and the window becoming visible again. They are skipped when no
//! repository is configured, when a pull is already running, or (for the
//! startup/interval triggers) within the cooldown of the previous pull.
//! A failed pull leaves the in-memory catalog untouched.

use crate::config::{COMMIT_MESSAGE, SYNC_COOLDOWN, SYNC_INTERVAL};
use crate::database::{CatalogData, RepoRef, Session, Settings};
use crate::error::{AppError, Result};
use crate::services::catalog::strip_secrets;
use crate::services::remote::CatalogRemote;
use crate::services::{CatalogService, SettingsService};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// What asked for a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncTrigger {
    PageLoad,
    Interval,
    VisibilityRegained,
    Manual,
}

/// Why a sync did not run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    NotConfigured,
    InProgress,
    Cooldown { remaining_secs: u64 },
}

/// Result of one sync attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SyncOutcome {
    /// Remote document merged into the local store
    Updated { items: usize },
    /// Remote document identical to the last one applied
    Unchanged,
    /// Commit probe found nothing newer than the local data
    UpToDate,
    Skipped(SkipReason),
    Failed(String),
}

/// Last sync result, shown as a status line
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub trigger: SyncTrigger,
    pub outcome: SyncOutcome,
    pub at: DateTime<Utc>,
}

/// Where the startup catalog came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadSource {
    Cache,
    Remote,
    Defaults,
}

/// Result of "Save to GitHub"
#[derive(Debug, Clone, Serialize)]
pub struct PublishReceipt {
    pub repo: String,
    pub sha: String,
    pub bytes: usize,
    pub items: usize,
}

/// Clears the in-progress flag when the pull finishes, even on early return
struct InProgressGuard<'a>(&'a AtomicBool);

impl<'a> InProgressGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncCoordinator<R> {
    remote: Arc<R>,
    catalog: CatalogService,
    settings: SettingsService,
    cooldown: Duration,
    in_progress: AtomicBool,
    last_pull: Mutex<Option<Instant>>,
    /// SHA-256 of the last document applied or published
    last_fingerprint: Mutex<Option<String>>,
    last_status: RwLock<Option<SyncStatus>>,
}

impl<R: CatalogRemote> SyncCoordinator<R> {
    pub fn new(remote: Arc<R>, catalog: CatalogService, settings: SettingsService) -> Self {
        Self::with_cooldown(remote, catalog, settings, SYNC_COOLDOWN)
    }

    pub fn with_cooldown(
        remote: Arc<R>,
        catalog: CatalogService,
        settings: SettingsService,
        cooldown: Duration,
    ) -> Self {
        Self {
            remote,
            catalog,
            settings,
            cooldown,
            in_progress: AtomicBool::new(false),
            last_pull: Mutex::new(None),
            last_fingerprint: Mutex::new(None),
            last_status: RwLock::new(None),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    pub async fn last_status(&self) -> Option<SyncStatus> {
        self.last_status.read().await.clone()
    }

    /// Startup load: local cache, then the published file, then defaults
    pub async fn initial_load(&self) -> Result<LoadSource> {
        if self.catalog.load_cached().await? {
            return Ok(LoadSource::Cache);
        }

        let settings = self.settings.get_settings().await?;
        if let Some(repo) = settings.repo_ref() {
            match self.fetch_remote(&repo, &settings).await {
                Ok((data, fingerprint)) => {
                    self.apply(data, fingerprint).await?;
                    tracing::info!("Loaded catalog from {}", repo);
                    return Ok(LoadSource::Remote);
                }
                Err(e) => {
                    tracing::warn!("Could not load published catalog, using defaults: {}", e);
                }
            }
        }

        self.catalog
            .replace(CatalogData::with_default_categories())
            .await;
        Ok(LoadSource::Defaults)
    }

    /// Scheduled pull, subject to every guard
    pub async fn auto_sync(&self, trigger: SyncTrigger) -> SyncOutcome {
        let outcome = self.guarded_pull(true).await;
        self.record(trigger, outcome).await
    }

    /// User-requested refresh; ignores the cooldown
    pub async fn sync_now(&self) -> SyncOutcome {
        let outcome = self.guarded_pull(false).await;
        self.record(SyncTrigger::Manual, outcome).await
    }

    /// Cheap "has it changed" probe before pulling.
    ///
    /// Compares the last commit touching the catalog file with the newest
    /// `lastModified` in the local store. Any newer commit counts as new
    /// data, even if it did not change the content.
    pub async fn on_visibility_regained(&self) -> SyncOutcome {
        let outcome = match self.visibility_check().await {
            Ok(outcome) => outcome,
            Err(e) => SyncOutcome::Failed(e.to_string()),
        };
        self.record(SyncTrigger::VisibilityRegained, outcome).await
    }

    async fn visibility_check(&self) -> Result<SyncOutcome> {
        let settings = self.settings.get_settings().await?;
        let Some(repo) = settings.repo_ref() else {
            return Ok(SyncOutcome::Skipped(SkipReason::NotConfigured));
        };
        let Some(_guard) = InProgressGuard::acquire(&self.in_progress) else {
            return Ok(SyncOutcome::Skipped(SkipReason::InProgress));
        };

        let remote_time = self.remote.last_change(&repo, settings.token()).await?;
        let local_time = self.catalog.snapshot().await.newest_modification();

        let newer = match (remote_time, local_time) {
            (Some(remote), Some(local)) => remote > local,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if !newer {
            tracing::debug!("Remote catalog not newer than local data");
            return Ok(SyncOutcome::UpToDate);
        }

        tracing::info!("Remote catalog changed at {:?}, pulling", remote_time);
        self.pull(&repo, &settings).await
    }

    async fn guarded_pull(&self, respect_cooldown: bool) -> SyncOutcome {
        let settings = match self.settings.get_settings().await {
            Ok(settings) => settings,
            Err(e) => return SyncOutcome::Failed(e.to_string()),
        };
        let Some(repo) = settings.repo_ref() else {
            return SyncOutcome::Skipped(SkipReason::NotConfigured);
        };
        let Some(_guard) = InProgressGuard::acquire(&self.in_progress) else {
            return SyncOutcome::Skipped(SkipReason::InProgress);
        };

        {
            let mut last_pull = self.last_pull.lock().await;
            if respect_cooldown {
                if let Some(elapsed) = last_pull.map(|at| at.elapsed()) {
                    if elapsed < self.cooldown {
                        let remaining_secs = (self.cooldown - elapsed).as_secs();
                        return SyncOutcome::Skipped(SkipReason::Cooldown { remaining_secs });
                    }
                }
            }
            *last_pull = Some(Instant::now());
        }

        match self.pull(&repo, &settings).await {
            Ok(outcome) => outcome,
            Err(e) => SyncOutcome::Failed(e.to_string()),
        }
    }

    /// Fetch and merge; the caller holds the in-progress guard
    async fn pull(&self, repo: &RepoRef, settings: &Settings) -> Result<SyncOutcome> {
        let (data, fingerprint) = self.fetch_remote(repo, settings).await?;

        if self.last_fingerprint.lock().await.as_deref() == Some(fingerprint.as_str()) {
            tracing::debug!("Published catalog unchanged");
            return Ok(SyncOutcome::Unchanged);
        }

        let items = data.total_items();
        self.apply(data, fingerprint).await?;
        Ok(SyncOutcome::Updated { items })
    }

    async fn fetch_remote(&self, repo: &RepoRef, settings: &Settings) -> Result<(CatalogData, String)> {
        let body = self.remote.fetch_published(repo).await?;
        let fingerprint = fingerprint(&body);
        let remote: CatalogData = serde_json::from_str(&body)?;
        Ok((merge_remote(remote, settings), fingerprint))
    }

    async fn apply(&self, data: CatalogData, fingerprint: String) -> Result<()> {
        self.catalog.replace(data).await;
        self.catalog.persist().await?;
        *self.last_fingerprint.lock().await = Some(fingerprint);
        Ok(())
    }

    async fn record(&self, trigger: SyncTrigger, outcome: SyncOutcome) -> SyncOutcome {
        match &outcome {
            SyncOutcome::Updated { items } => {
                tracing::info!("Sync ({:?}) merged remote catalog: {} items", trigger, items)
            }
            SyncOutcome::Failed(message) => {
                tracing::error!("Sync ({:?}) failed: {}", trigger, message)
            }
            other => tracing::debug!("Sync ({:?}): {:?}", trigger, other),
        }

        *self.last_status.write().await = Some(SyncStatus {
            trigger,
            outcome: outcome.clone(),
            at: Utc::now(),
        });
        outcome
    }

    /// "Save to GitHub": write the whole catalog over the remote file
    pub async fn publish(&self, session: &Session) -> Result<PublishReceipt> {
        if !session.is_valid_at(Utc::now()) {
            return Err(AppError::SessionExpired);
        }

        let repo = &session.repo;
        let token = session.token.as_str();

        let existing = self.remote.read_file(repo, token).await?;
        let data = strip_secrets(self.catalog.snapshot().await);
        let content = serde_json::to_string_pretty(&data)?;

        let sha = self
            .remote
            .write_file(
                repo,
                token,
                &content,
                existing.as_ref().map(|f| f.sha.as_str()),
                COMMIT_MESSAGE,
            )
            .await?;

        self.catalog.persist().await?;
        *self.last_fingerprint.lock().await = Some(fingerprint(&content));

        tracing::info!("Published catalog to {} ({})", repo, sha);
        Ok(PublishReceipt {
            repo: repo.to_string(),
            sha,
            bytes: content.len(),
            items: data.total_items(),
        })
    }

    /// Run the startup pull now and then every sync interval
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Starting sync scheduler ({:?} interval)", SYNC_INTERVAL);

            let mut interval = tokio::time::interval(SYNC_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut trigger = SyncTrigger::PageLoad;
            loop {
                interval.tick().await;
                self.auto_sync(trigger).await;
                trigger = SyncTrigger::Interval;
            }
        })
    }
}

/// Remote catalog wins; local settings fields are laid over the remote
/// settings object so they never depend on the published copy
pub fn merge_remote(mut remote: CatalogData, local: &Settings) -> CatalogData {
    let overlay = [
        ("githubToken", &local.github_token),
        ("githubUsername", &local.github_username),
        ("githubRepo", &local.github_repo),
    ];

    let mut settings = remote.settings.take().unwrap_or_else(Map::new);
    for (key, value) in overlay {
        if value.is_empty() {
            settings.remove(key);
        } else {
            settings.insert(key.to_string(), Value::from(value.as_str()));
        }
    }

    remote.settings = (!settings.is_empty()).then_some(settings);
    remote
}

fn fingerprint(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}
