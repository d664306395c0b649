//! Browser tab control
//!
//! The registry only sees the [`TabControl`] trait. [`InMemoryTabs`] is the
//! host used by the HTTP server: tabs are opened and removed through the API
//! and closed or recreated by the timer engine.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    },
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::state::TabId;

/// A browser tab as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TabError {
    #[error("Tab {0} not found")]
    NotFound(TabId),

    #[error("Tab host unavailable: {0}")]
    Host(String),
}

/// Host operations on browser tabs
pub trait TabControl: Send + Sync {
    fn get_tab(&self, tab_id: TabId) -> Result<Tab, TabError>;

    fn close_tab(&self, tab_id: TabId) -> Result<(), TabError>;

    fn create_tab(&self, url: &str) -> Result<Tab, TabError>;
}

/// Tab table kept in process memory
#[derive(Debug)]
pub struct InMemoryTabs {
    tabs: Mutex<BTreeMap<TabId, Tab>>,
    next_id: AtomicU32,
}

impl InMemoryTabs {
    pub fn new() -> Self {
        Self {
            tabs: Mutex::new(BTreeMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    /// Open a tab; the url doubles as the title when none is given
    pub fn open(&self, url: &str, title: Option<String>) -> Result<Tab, TabError> {
        let tab = Tab {
            id: TabId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            url: url.to_string(),
            title: title.unwrap_or_else(|| url.to_string()),
        };

        self.lock()?.insert(tab.id, tab.clone());
        info!("Opened tab {} ({})", tab.id, tab.url);
        Ok(tab)
    }

    /// Drop a tab from the table, as when the user closes it by hand
    pub fn remove(&self, tab_id: TabId) -> Result<Option<Tab>, TabError> {
        Ok(self.lock()?.remove(&tab_id))
    }

    /// All open tabs ordered by id
    pub fn list(&self) -> Result<Vec<Tab>, TabError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<TabId, Tab>>, TabError> {
        self.tabs
            .lock()
            .map_err(|e| TabError::Host(format!("Failed to lock tab table: {}", e)))
    }
}

impl Default for InMemoryTabs {
    fn default() -> Self {
        Self::new()
    }
}

impl TabControl for InMemoryTabs {
    fn get_tab(&self, tab_id: TabId) -> Result<Tab, TabError> {
        self.lock()?
            .get(&tab_id)
            .cloned()
            .ok_or(TabError::NotFound(tab_id))
    }

    fn close_tab(&self, tab_id: TabId) -> Result<(), TabError> {
        match self.lock()?.remove(&tab_id) {
            Some(tab) => {
                info!("Tab {} ({}) closed", tab_id, tab.url);
                Ok(())
            }
            None => Err(TabError::NotFound(tab_id)),
        }
    }

    fn create_tab(&self, url: &str) -> Result<Tab, TabError> {
        debug!("Creating tab for {}", url);
        self.open(url, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_assigns_increasing_ids() {
        let tabs = InMemoryTabs::new();
        let first = tabs.open("https://a.example", Some("A".into())).unwrap();
        let second = tabs.open("https://b.example", None).unwrap();

        assert!(second.id > first.id);
        assert_eq!(second.title, "https://b.example");
        assert_eq!(tabs.list().unwrap().len(), 2);
    }

    #[test]
    fn closing_missing_tab_is_not_found() {
        let tabs = InMemoryTabs::new();
        let tab = tabs.open("https://a.example", None).unwrap();

        tabs.close_tab(tab.id).unwrap();
        assert_eq!(tabs.close_tab(tab.id), Err(TabError::NotFound(tab.id)));
        assert_eq!(tabs.get_tab(tab.id), Err(TabError::NotFound(tab.id)));
    }

    #[test]
    fn create_tab_reuses_url() {
        let tabs = InMemoryTabs::new();
        let tab = tabs.create_tab("https://news.example").unwrap();
        assert_eq!(tabs.get_tab(tab.id).unwrap().url, "https://news.example");
    }
}
