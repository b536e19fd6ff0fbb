//! Application configuration
//!
//! Central location for sync timings, storage keys, GitHub endpoints and
//! validation boundaries, plus the environment-driven runtime config.

use std::path::PathBuf;
use std::time::Duration;

// ===== Sync Timing =====

/// Interval between scheduled background pulls (30 minutes)
pub const SYNC_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Minimum spacing between two automatic pulls (5 minutes)
pub const SYNC_COOLDOWN: Duration = Duration::from_secs(5 * 60);

// ===== Admin Session =====

/// Admin sessions are valid for 24 hours after login
pub const SESSION_TTL_HOURS: i64 = 24;

/// Accepted personal-access-token prefixes (classic and fine-grained)
pub const TOKEN_PREFIXES: &[&str] = &["ghp_", "github_pat_"];

/// Page size used when listing the user's repositories
pub const REPOS_PER_PAGE: u32 = 100;

// ===== Remote File =====

/// Path of the catalog document inside the repository
pub const DATA_FILE_PATH: &str = "data.json";

/// Commit message used by "Save to GitHub"
pub const COMMIT_MESSAGE: &str = "Update data.json from Falcon X admin";

/// Sent with every GitHub request
pub const USER_AGENT: &str = "FalconX-Admin";

// ===== Local Storage Keys =====

pub const KEY_DATA: &str = "falconx_data";
pub const KEY_SETTINGS: &str = "falconx_settings";
pub const KEY_DATA_TIMESTAMP: &str = "falconx_data_timestamp";
pub const KEY_THEME: &str = "theme";
pub const KEY_LANGUAGE: &str = "language";
/// Prefix for per-warning dismissal flags
pub const KEY_WARNING_PREFIX: &str = "warning_dismissed_";

// ===== Session Storage Keys =====

pub const SESSION_KEY_ADMIN: &str = "adminSession";
pub const SESSION_KEY_CURRENT_TAB: &str = "currentTab";

/// Settings fields that must never be written to the public repository
pub const SECRET_SETTINGS_KEYS: &[&str] = &["githubToken", "githubUsername", "githubRepo"];

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the local storage database.
    /// Env: `FALCONX_DATA_DIR`
    /// Default: `./falconx-data`
    pub data_dir: PathBuf,

    /// Base URL of the GitHub REST API.
    /// Env: `FALCONX_GITHUB_API`
    /// Default: `https://api.github.com`
    pub api_base: String,

    /// Base URL for unauthenticated raw content reads.
    /// Env: `FALCONX_GITHUB_RAW`
    /// Default: `https://raw.githubusercontent.com`
    pub raw_base: String,

    /// Branch the catalog document lives on.
    /// Env: `FALCONX_BRANCH`
    /// Default: `main`
    pub branch: String,

    /// Repository owner seeded into settings on first run.
    /// Env: `FALCONX_GITHUB_OWNER`
    pub default_owner: Option<String>,

    /// Repository name seeded into settings on first run.
    /// Env: `FALCONX_GITHUB_REPO`
    pub default_repo: Option<String>,

    /// Per-request HTTP timeout.
    /// Env: `FALCONX_HTTP_TIMEOUT_SECS`
    /// Default: `30`
    pub http_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./falconx-data"),
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            branch: "main".to_string(),
            default_owner: None,
            default_repo: None,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("FALCONX_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Ok(base) = std::env::var("FALCONX_GITHUB_API") {
            config.api_base = base.trim_end_matches('/').to_string();
        }

        if let Ok(base) = std::env::var("FALCONX_GITHUB_RAW") {
            config.raw_base = base.trim_end_matches('/').to_string();
        }

        if let Ok(branch) = std::env::var("FALCONX_BRANCH") {
            if !branch.trim().is_empty() {
                config.branch = branch;
            }
        }

        config.default_owner = non_empty_var("FALCONX_GITHUB_OWNER");
        config.default_repo = non_empty_var("FALCONX_GITHUB_REPO");

        if let Ok(val) = std::env::var("FALCONX_HTTP_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.http_timeout = Duration::from_secs(secs),
                _ => {
                    tracing::warn!(value = %val, "Invalid FALCONX_HTTP_TIMEOUT_SECS, using default");
                }
            }
        }

        config
    }

    /// Path of the SQLite file backing local storage
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("falconx.sqlite")
    }

    /// Directory for JSON exports
    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.api_base, "https://api.github.com");
        assert_eq!(config.branch, "main");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.default_owner.is_none());
    }

    #[test]
    fn test_paths_live_under_data_dir() {
        let config = AppConfig {
            data_dir: PathBuf::from("/tmp/fx"),
            ..AppConfig::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/tmp/fx/falconx.sqlite"));
        assert_eq!(config.exports_dir(), PathBuf::from("/tmp/fx/exports"));
    }

    #[test]
    fn test_cooldown_shorter_than_interval() {
        assert!(SYNC_COOLDOWN < SYNC_INTERVAL);
    }
}
