//! Deep links
//!
//! `?tab=<tab>&item=<id>` opens a catalog tab, and optionally an item's
//! detail view, straight from a shared URL.

use crate::config::SESSION_KEY_CURRENT_TAB;
use crate::database::CatalogType;
use crate::error::{AppError, Result};
use crate::storage::SessionStore;
use reqwest::Url;

/// Parsed `?tab=&item=` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeepLink {
    pub catalog: CatalogType,
    pub item_id: Option<i64>,
}

impl DeepLink {
    /// Parse a full URL or a bare query string (`?tab=...` or `tab=...`)
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let url = match Url::parse(input) {
            Ok(url) => url,
            Err(_) => {
                let query = input.trim_start_matches('?');
                Url::parse(&format!("https://falconx.invalid/?{}", query))
                    .map_err(|e| AppError::Validation(format!("Invalid link: {}", e)))?
            }
        };

        let mut tab = None;
        let mut item = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "tab" => tab = Some(value.into_owned()),
                "item" => item = Some(value.into_owned()),
                _ => {}
            }
        }

        let tab = tab.ok_or_else(|| AppError::Validation("Link has no tab".to_string()))?;
        let catalog = tab.parse::<CatalogType>().map_err(AppError::Validation)?;

        let item_id = item
            .map(|id| {
                id.parse::<i64>()
                    .map_err(|_| AppError::Validation(format!("Invalid item id: {}", id)))
            })
            .transpose()?;

        Ok(Self { catalog, item_id })
    }

    /// Query string for sharing
    pub fn to_query(&self) -> String {
        match self.item_id {
            Some(id) => format!("?tab={}&item={}", self.catalog.tab(), id),
            None => format!("?tab={}", self.catalog.tab()),
        }
    }
}

/// Remember the open tab for this session
pub async fn set_current_tab(sessions: &SessionStore, catalog: CatalogType) {
    sessions.set(SESSION_KEY_CURRENT_TAB, catalog.tab()).await;
}

/// Tab to reopen, defaulting to the first catalog
pub async fn current_tab(sessions: &SessionStore) -> CatalogType {
    sessions
        .get(SESSION_KEY_CURRENT_TAB)
        .await
        .and_then(|t| t.parse().ok())
        .unwrap_or(CatalogType::WindowsPrograms)
}
