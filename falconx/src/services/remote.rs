//! Remote store seams
//!
//! The sync coordinator and the admin login only see these traits, so the
//! GitHub client can be swapped for an in-process double.

use crate::database::RepoRef;
use crate::error::Result;
use crate::services::github::{GitHubClient, GitHubRepo, GitHubUser, RemoteFile};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Where the catalog document is published
pub trait CatalogRemote: Send + Sync + 'static {
    /// Public, possibly stale, read of the catalog document
    fn fetch_published(&self, repo: &RepoRef) -> impl Future<Output = Result<String>> + Send;

    /// Time of the last commit touching the catalog document
    fn last_change(
        &self,
        repo: &RepoRef,
        token: Option<&str>,
    ) -> impl Future<Output = Result<Option<DateTime<Utc>>>> + Send;

    /// Authenticated read with the SHA needed for the next write
    fn read_file(
        &self,
        repo: &RepoRef,
        token: &str,
    ) -> impl Future<Output = Result<Option<RemoteFile>>> + Send;

    /// Replace the whole document, returning the new SHA
    fn write_file(
        &self,
        repo: &RepoRef,
        token: &str,
        content: &str,
        sha: Option<&str>,
        message: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Account lookups used by the admin login
pub trait AccountApi: Send + Sync + 'static {
    fn current_user(&self, token: &str) -> impl Future<Output = Result<GitHubUser>> + Send;

    fn user_repos(&self, token: &str) -> impl Future<Output = Result<Vec<GitHubRepo>>> + Send;

    fn repository(
        &self,
        token: &str,
        repo: &RepoRef,
    ) -> impl Future<Output = Result<GitHubRepo>> + Send;
}

impl CatalogRemote for GitHubClient {
    async fn fetch_published(&self, repo: &RepoRef) -> Result<String> {
        self.fetch_raw(repo).await
    }

    async fn last_change(
        &self,
        repo: &RepoRef,
        token: Option<&str>,
    ) -> Result<Option<DateTime<Utc>>> {
        self.latest_commit_time(repo, token).await
    }

    async fn read_file(&self, repo: &RepoRef, token: &str) -> Result<Option<RemoteFile>> {
        self.get_contents(repo, token).await
    }

    async fn write_file(
        &self,
        repo: &RepoRef,
        token: &str,
        content: &str,
        sha: Option<&str>,
        message: &str,
    ) -> Result<String> {
        self.put_contents(repo, token, content, sha, message).await
    }
}

impl AccountApi for GitHubClient {
    async fn current_user(&self, token: &str) -> Result<GitHubUser> {
        self.get_user(token).await
    }

    async fn user_repos(&self, token: &str) -> Result<Vec<GitHubRepo>> {
        self.list_repos(token).await
    }

    async fn repository(&self, token: &str, repo: &RepoRef) -> Result<GitHubRepo> {
        self.get_repo(token, repo).await
    }
}
