//! Catalog commands
//!
//! Browsing, deep links and the admin editing operations. Every change is
//! written back to the local store before returning.

use crate::app::AppState;
use crate::database::{CatalogItem, CatalogType, ItemStatus};
use crate::error::{AppError, Result};
use crate::services::catalog::validate_item;
use crate::services::links::{current_tab, set_current_tab};
use crate::services::DeepLink;
use std::fmt::Write as _;

/// Items of one catalog, optionally filtered
pub async fn list_items(
    state: &AppState,
    catalog: Option<CatalogType>,
    query: Option<&str>,
    category: Option<&str>,
) -> Result<(CatalogType, Vec<CatalogItem>)> {
    let catalog = match catalog {
        Some(catalog) => catalog,
        None => current_tab(&state.sessions).await,
    };
    set_current_tab(&state.sessions, catalog).await;

    let items = state.catalog.search_items(catalog, query, category).await;
    Ok((catalog, items))
}

/// Text grid for one catalog; an empty list reads "No items found"
pub fn render_grid(catalog: CatalogType, items: &[CatalogItem]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", catalog.label(), items.len());

    if items.is_empty() {
        out.push_str("No items found\n");
        return out;
    }

    for item in items {
        let status = match item.status {
            ItemStatus::Original => "original",
            ItemStatus::Modified => "modified",
        };
        let _ = writeln!(
            out,
            "{:>14}  {:<32}  {:<16}  {:<10}  {}",
            item.id,
            item.name,
            item.category,
            item.version.as_deref().unwrap_or("-"),
            status,
        );
    }
    out
}

/// One item's details
pub async fn show_item(state: &AppState, catalog: CatalogType, id: i64) -> Result<CatalogItem> {
    state
        .catalog
        .find_item(catalog, id)
        .await
        .ok_or_else(|| AppError::ItemNotFound {
            catalog: catalog.to_string(),
            id,
        })
}

/// Resolve a shared link to its tab and, when it names one, its item.
///
/// An item id that no longer exists opens the tab without a detail view.
pub async fn open_link(state: &AppState, link: &str) -> Result<(DeepLink, Option<CatalogItem>)> {
    let link = DeepLink::parse(link)?;
    set_current_tab(&state.sessions, link.catalog).await;

    let item = match link.item_id {
        Some(id) => {
            let found = state.catalog.find_item(link.catalog, id).await;
            if found.is_none() {
                tracing::warn!("Linked item {} not found in {}", id, link.catalog);
            }
            found
        }
        None => None,
    };

    Ok((link, item))
}

/// Shareable link for an item
pub async fn share_link(state: &AppState, catalog: CatalogType, id: i64) -> Result<String> {
    let item = show_item(state, catalog, id).await?;
    Ok(DeepLink {
        catalog,
        item_id: Some(item.id),
    }
    .to_query())
}

pub async fn list_categories(state: &AppState, catalog: CatalogType) -> Vec<String> {
    state.catalog.get_categories(catalog).await
}

pub async fn add_category(state: &AppState, catalog: CatalogType, name: &str) -> Result<bool> {
    let added = state.catalog.add_category(catalog, name).await?;
    if added {
        state.catalog.persist().await?;
    }
    Ok(added)
}

pub async fn delete_category(state: &AppState, catalog: CatalogType, name: &str) -> Result<bool> {
    let removed = state.catalog.delete_category(catalog, name).await;
    if removed {
        state.catalog.persist().await?;
    }
    Ok(removed)
}

/// Parse an item from its JSON form and check its links
pub fn parse_item(json: &str) -> Result<CatalogItem> {
    let item: CatalogItem = serde_json::from_str(json)?;
    validate_item(&item)?;
    Ok(item)
}

pub async fn add_item(state: &AppState, catalog: CatalogType, json: &str) -> Result<CatalogItem> {
    let item = parse_item(json)?;
    let item = state.catalog.add_item(catalog, item).await;
    state.catalog.persist().await?;
    Ok(item)
}

pub async fn update_item(
    state: &AppState,
    catalog: CatalogType,
    id: i64,
    json: &str,
) -> Result<CatalogItem> {
    let item = parse_item(json)?;
    let item = state.catalog.update_item(catalog, id, item).await?;
    state.catalog.persist().await?;
    Ok(item)
}

pub async fn delete_item(state: &AppState, catalog: CatalogType, id: i64) -> Result<bool> {
    let removed = state.catalog.delete_item(catalog, id).await;
    if removed {
        state.catalog.persist().await?;
    }
    Ok(removed)
}
