//! GitHub REST client
//!
//! Talks to the GitHub v3 API for the admin flow and the catalog file:
//! - `/user` and `/user/repos` to validate tokens and list repositories
//! - `/repos/{owner}/{repo}` to confirm repository access
//! - `/repos/{owner}/{repo}/contents/data.json` to read and write the catalog
//! - `/repos/{owner}/{repo}/commits` to find the last change to the catalog
//!
//! Public reads bypass the API and go to raw.githubusercontent.com, which is
//! CDN-cached and may lag the repository by a few minutes.

use crate::config::{AppConfig, DATA_FILE_PATH, REPOS_PER_PAGE, USER_AGENT};
use crate::database::RepoRef;
use crate::error::{AppError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// Authenticated user from `/user`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Repository summary from `/user/repos` and `/repos/{owner}/{repo}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub owner: GitHubOwner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
}

impl GitHubRepo {
    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(&self.owner.login, &self.name)
    }
}

/// Catalog file as returned by the Contents API
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    pub content: String,
    /// Blob SHA required by the next write
    pub sha: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutContentsResponse {
    content: PutContentsEntry,
}

#[derive(Deserialize)]
struct PutContentsEntry {
    sha: String,
}

#[derive(Deserialize)]
struct CommitEntry {
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    committer: CommitSignature,
}

#[derive(Deserialize)]
struct CommitSignature {
    date: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

/// Client for the GitHub REST API
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    raw_base: String,
    branch: String,
}

impl GitHubClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::Generic(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            raw_base: config.raw_base.clone(),
            branch: config.branch.clone(),
        })
    }

    fn api(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let request = self
            .http
            .request(method, format!("{}{}", self.api_base, path))
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");

        match token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Validate a token by fetching its user
    pub async fn get_user(&self, token: &str) -> Result<GitHubUser> {
        let response = self.api(Method::GET, "/user", Some(token)).send().await?;
        let user: GitHubUser = check_status(response).await?.json().await?;
        tracing::info!("Token belongs to GitHub user {}", user.login);
        Ok(user)
    }

    /// Repositories the token can see, most recently updated first
    pub async fn list_repos(&self, token: &str) -> Result<Vec<GitHubRepo>> {
        let path = format!("/user/repos?per_page={}&sort=updated", REPOS_PER_PAGE);
        let response = self.api(Method::GET, &path, Some(token)).send().await?;
        let repos: Vec<GitHubRepo> = check_status(response).await?.json().await?;
        tracing::debug!("Listed {} repositories", repos.len());
        Ok(repos)
    }

    pub async fn get_repo(&self, token: &str, repo: &RepoRef) -> Result<GitHubRepo> {
        let path = format!("/repos/{}/{}", repo.owner, repo.name);
        let response = self.api(Method::GET, &path, Some(token)).send().await?;
        Ok(check_status(response).await?.json().await?)
    }

    /// Unauthenticated read of the published catalog
    pub async fn fetch_raw(&self, repo: &RepoRef) -> Result<String> {
        let url = format!(
            "{}/{}/{}/{}/{}?t={}",
            self.raw_base,
            repo.owner,
            repo.name,
            self.branch,
            DATA_FILE_PATH,
            Utc::now().timestamp_millis()
        );

        tracing::debug!("Fetching published catalog from {}", url);
        let response = self.http.get(&url).send().await?;
        Ok(check_status(response).await?.text().await?)
    }

    /// Authenticated read returning content and blob SHA.
    ///
    /// `None` means the file does not exist yet.
    pub async fn get_contents(&self, repo: &RepoRef, token: &str) -> Result<Option<RemoteFile>> {
        let path = format!(
            "/repos/{}/{}/contents/{}?ref={}",
            repo.owner, repo.name, DATA_FILE_PATH, self.branch
        );
        let response = self.api(Method::GET, &path, Some(token)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::info!("{} does not exist in {} yet", DATA_FILE_PATH, repo);
            return Ok(None);
        }

        let body: ContentsResponse = check_status(response).await?.json().await?;
        if body.encoding.as_deref().is_some_and(|e| e != "base64") {
            return Err(AppError::Generic(format!(
                "{} is too large for the Contents API",
                DATA_FILE_PATH
            )));
        }

        Ok(Some(RemoteFile {
            content: decode_content(&body.content)?,
            sha: body.sha,
        }))
    }

    /// Write the whole catalog file, returning the new blob SHA
    pub async fn put_contents(
        &self,
        repo: &RepoRef,
        token: &str,
        content: &str,
        sha: Option<&str>,
        message: &str,
    ) -> Result<String> {
        let path = format!("/repos/{}/{}/contents/{}", repo.owner, repo.name, DATA_FILE_PATH);
        let body = PutContentsRequest {
            message,
            content: STANDARD.encode(content.as_bytes()),
            branch: &self.branch,
            sha,
        };

        let response = self
            .api(Method::PUT, &path, Some(token))
            .json(&body)
            .send()
            .await?;

        let written: PutContentsResponse = check_status(response).await?.json().await?;
        tracing::info!("Wrote {} to {} ({} bytes)", DATA_FILE_PATH, repo, content.len());
        Ok(written.content.sha)
    }

    /// Commit time of the last change to the catalog file
    pub async fn latest_commit_time(
        &self,
        repo: &RepoRef,
        token: Option<&str>,
    ) -> Result<Option<DateTime<Utc>>> {
        let path = format!(
            "/repos/{}/{}/commits?path={}&sha={}&per_page=1",
            repo.owner, repo.name, DATA_FILE_PATH, self.branch
        );
        let response = self.api(Method::GET, &path, token).send().await?;
        let commits: Vec<CommitEntry> = check_status(response).await?.json().await?;

        Ok(commits.into_iter().next().map(|c| c.commit.committer.date))
    }
}

/// Pass successful responses through, map failures to `AppError`
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    let err = error_for_status(status, &headers, &body);
    tracing::warn!("GitHub request failed: {}", err);
    Err(err)
}

fn error_for_status(status: StatusCode, headers: &HeaderMap, body: &str) -> AppError {
    let message = serde_json::from_str::<ApiMessage>(body)
        .map(|m| m.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());

    match status {
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS if is_rate_limited(headers) => {
            AppError::RateLimited {
                reset_at: rate_limit_reset(headers),
            }
        }
        StatusCode::UNAUTHORIZED => AppError::InvalidToken(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        StatusCode::UNPROCESSABLE_ENTITY if message.contains("sha") => AppError::Conflict(message),
        _ => AppError::GitHub {
            status: status.as_u16(),
            message,
        },
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn is_rate_limited(headers: &HeaderMap) -> bool {
    header_str(headers, "x-ratelimit-remaining").is_some_and(|v| v.trim() == "0")
}

fn rate_limit_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    header_str(headers, "x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

/// Contents API base64 is wrapped at 60 columns
fn decode_content(encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| AppError::Generic(format!("Invalid base64 content: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| AppError::Generic(format!("Catalog file is not UTF-8: {}", e)))
}
