//! Data models
//!
//! Rust structs for the catalog document, local settings and the admin
//! session. Field names serialize in the camelCase used by `data.json`.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::SESSION_TTL_HOURS;

/// One of the six fixed catalog sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CatalogType {
    WindowsPrograms,
    WindowsGames,
    AndroidApps,
    AndroidGames,
    PhoneTools,
    FrpApps,
}

impl CatalogType {
    pub const ALL: [CatalogType; 6] = [
        CatalogType::WindowsPrograms,
        CatalogType::WindowsGames,
        CatalogType::AndroidApps,
        CatalogType::AndroidGames,
        CatalogType::PhoneTools,
        CatalogType::FrpApps,
    ];

    /// Key used in `data.json`
    pub fn key(self) -> &'static str {
        match self {
            CatalogType::WindowsPrograms => "windowsPrograms",
            CatalogType::WindowsGames => "windowsGames",
            CatalogType::AndroidApps => "androidApps",
            CatalogType::AndroidGames => "androidGames",
            CatalogType::PhoneTools => "phoneTools",
            CatalogType::FrpApps => "frpApps",
        }
    }

    /// Tab slug used in deep links (`?tab=`)
    pub fn tab(self) -> &'static str {
        match self {
            CatalogType::WindowsPrograms => "windows-programs",
            CatalogType::WindowsGames => "windows-games",
            CatalogType::AndroidApps => "android-apps",
            CatalogType::AndroidGames => "android-games",
            CatalogType::PhoneTools => "phone-tools",
            CatalogType::FrpApps => "frp-apps",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CatalogType::WindowsPrograms => "Windows Programs",
            CatalogType::WindowsGames => "Windows Games",
            CatalogType::AndroidApps => "Android Apps",
            CatalogType::AndroidGames => "Android Games",
            CatalogType::PhoneTools => "Phone Tools",
            CatalogType::FrpApps => "FRP Apps",
        }
    }

    /// Categories shipped with the built-in catalog
    pub fn default_categories(self) -> &'static [&'static str] {
        match self {
            CatalogType::WindowsPrograms => &[
                "Utilities",
                "Multimedia",
                "Office",
                "Security",
                "Development",
                "Internet",
            ],
            CatalogType::WindowsGames => &["Action", "Adventure", "Racing", "Sports", "Strategy"],
            CatalogType::AndroidApps => &[
                "Social",
                "Tools",
                "Multimedia",
                "Productivity",
                "Education",
            ],
            CatalogType::AndroidGames => &["Action", "Puzzle", "Racing", "Arcade", "Strategy"],
            CatalogType::PhoneTools => &["Flashing", "Unlocking", "Repair", "Drivers"],
            CatalogType::FrpApps => &["Samsung", "Xiaomi", "Huawei", "Oppo", "General"],
        }
    }
}

impl fmt::Display for CatalogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CatalogType {
    type Err = String;

    /// Accepts the document key (`androidApps`) or the tab slug (`android-apps`)
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        CatalogType::ALL
            .into_iter()
            .find(|t| t.key().eq_ignore_ascii_case(s) || t.tab().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown catalog type: {}", s))
    }
}

/// Whether a download is the vendor build or a patched one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ItemStatus {
    #[default]
    Original,
    Modified,
}

/// How an FRP tool is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrpType {
    Direct,
    Download,
}

/// A downloadable catalog entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Creation timestamp in milliseconds, doubles as identity
    #[serde(default)]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub short_desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub status: ItemStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub screenshots: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub note_color: String,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub frp_type: Option<FrpType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_link: Option<String>,
    /// Fields written by newer site versions, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `null` reads as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Values that do not parse (`""`, unknown variants, bad dates) read as absent
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// The whole catalog document (`data.json`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogData {
    #[serde(default)]
    pub windows_programs: Vec<CatalogItem>,
    #[serde(default)]
    pub windows_games: Vec<CatalogItem>,
    #[serde(default)]
    pub android_apps: Vec<CatalogItem>,
    #[serde(default)]
    pub android_games: Vec<CatalogItem>,
    #[serde(default)]
    pub phone_tools: Vec<CatalogItem>,
    #[serde(default)]
    pub frp_apps: Vec<CatalogItem>,
    /// Catalog type key -> category names
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,
}

impl CatalogData {
    /// Built-in catalog used when neither cache nor remote is available
    pub fn with_default_categories() -> Self {
        let categories = CatalogType::ALL
            .into_iter()
            .map(|t| {
                let names = t.default_categories().iter().map(|c| c.to_string()).collect();
                (t.key().to_string(), names)
            })
            .collect();

        Self {
            categories,
            ..Self::default()
        }
    }

    pub fn items(&self, catalog: CatalogType) -> &[CatalogItem] {
        match catalog {
            CatalogType::WindowsPrograms => &self.windows_programs,
            CatalogType::WindowsGames => &self.windows_games,
            CatalogType::AndroidApps => &self.android_apps,
            CatalogType::AndroidGames => &self.android_games,
            CatalogType::PhoneTools => &self.phone_tools,
            CatalogType::FrpApps => &self.frp_apps,
        }
    }

    pub fn items_mut(&mut self, catalog: CatalogType) -> &mut Vec<CatalogItem> {
        match catalog {
            CatalogType::WindowsPrograms => &mut self.windows_programs,
            CatalogType::WindowsGames => &mut self.windows_games,
            CatalogType::AndroidApps => &mut self.android_apps,
            CatalogType::AndroidGames => &mut self.android_games,
            CatalogType::PhoneTools => &mut self.phone_tools,
            CatalogType::FrpApps => &mut self.frp_apps,
        }
    }

    pub fn categories(&self, catalog: CatalogType) -> &[String] {
        self.categories
            .get(catalog.key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn categories_mut(&mut self, catalog: CatalogType) -> &mut Vec<String> {
        self.categories.entry(catalog.key().to_string()).or_default()
    }

    /// Iterate every item of every catalog type
    pub fn all_items(&self) -> impl Iterator<Item = &CatalogItem> {
        CatalogType::ALL.into_iter().flat_map(move |t| self.items(t).iter())
    }

    /// Newest `lastModified` across the whole catalog
    pub fn newest_modification(&self) -> Option<DateTime<Utc>> {
        self.all_items().filter_map(|i| i.last_modified).max()
    }

    /// Largest id in use, 0 for an empty catalog
    pub fn max_id(&self) -> i64 {
        self.all_items().map(|i| i.id).max().unwrap_or(0)
    }

    pub fn total_items(&self) -> usize {
        self.all_items().count()
    }
}

/// GitHub settings kept only in local storage
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub github_token: String,
    #[serde(default)]
    pub github_username: String,
    #[serde(default)]
    pub github_repo: String,
}

impl Settings {
    /// Repository the site reads from, if both parts are set
    pub fn repo_ref(&self) -> Option<RepoRef> {
        let owner = self.github_username.trim();
        let name = self.github_repo.trim();
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some(RepoRef::new(owner, name))
    }

    pub fn token(&self) -> Option<&str> {
        let token = self.github_token.trim();
        (!token.is_empty()).then_some(token)
    }

    /// Shallow merge: only the fields present in the update are replaced
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(token) = update.github_token {
            self.github_token = token;
        }
        if let Some(username) = update.github_username {
            self.github_username = username;
        }
        if let Some(repo) = update.github_repo {
            self.github_repo = repo;
        }
    }
}

/// Partial settings update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub github_token: Option<String>,
    pub github_username: Option<String>,
    pub github_repo: Option<String>,
}

/// Owner/name pair identifying a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Authenticated admin session held in session storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub repo: RepoRef,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub login_time: DateTime<Utc>,
}

impl Session {
    /// Session starting at `login_time`, kept to the millisecond precision
    /// it is stored with
    pub fn new(token: String, repo: RepoRef, login_time: DateTime<Utc>) -> Self {
        Self {
            token,
            repo,
            login_time: login_time.trunc_subsecs(3),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.login_time + Duration::hours(SESSION_TTL_HOURS)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

/// Row of the local storage table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredValue {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
