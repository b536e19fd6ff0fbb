//! Services module
//!
//! Business logic services that coordinate between commands and storage.

pub mod auth;
pub mod backup;
pub mod catalog;
pub mod github;
pub mod links;
pub mod remote;
pub mod settings;
pub mod sync;

pub use auth::AdminAuth;
pub use backup::BackupService;
pub use catalog::CatalogService;
pub use github::GitHubClient;
pub use links::DeepLink;
pub use remote::{AccountApi, CatalogRemote};
pub use settings::SettingsService;
pub use sync::SyncCoordinator;
