//! Tab Workspace
//!
//! Ordered collection of open documents (encounter results, magic-item
//! summaries, blank tabs) with one active tab. Insertion order is display
//! order.
//!
//! Closing the active tab activates the tab immediately before it; when the
//! first tab is closed the new first tab takes over, and an empty workspace
//! has no active tab.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("Tab already open: {0}")]
    DuplicateTab(String),

    #[error("Tab not found: {0}")]
    TabNotFound(String),
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TabKind {
    Encounter,
    MagicItems,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TabKind,
    pub title: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
}

impl TabDocument {
    pub fn new(kind: TabKind, title: impl Into<String>, data: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            data,
            created_at: Utc::now(),
            error: None,
            generation_time_ms: None,
            logs: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(TabKind::Empty, "New Tab", Value::Null)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Default)]
pub struct Workspace {
    tabs: Vec<TabDocument>,
    active: Option<String>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[TabDocument] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&TabDocument> {
        let id = self.active.as_deref()?;
        self.get(id)
    }

    pub fn get(&self, id: &str) -> Option<&TabDocument> {
        self.tabs.iter().find(|t| t.id == id)
    }

    /// Append a tab and make it active.
    pub fn add_tab(&mut self, doc: TabDocument) -> Result<&TabDocument> {
        if self.get(&doc.id).is_some() {
            return Err(WorkspaceError::DuplicateTab(doc.id));
        }
        log::debug!("Opening tab {} ({:?})", doc.id, doc.kind);
        self.active = Some(doc.id.clone());
        self.tabs.push(doc);
        Ok(&self.tabs[self.tabs.len() - 1])
    }

    /// Remove a tab, promoting a neighbour if it was active.
    pub fn close_tab(&mut self, id: &str) -> Option<TabDocument> {
        let index = self.tabs.iter().position(|t| t.id == id)?;
        let closed = self.tabs.remove(index);

        if self.active.as_deref() == Some(id) {
            self.active = if self.tabs.is_empty() {
                None
            } else {
                let successor = index.saturating_sub(1);
                Some(self.tabs[successor].id.clone())
            };
        }
        Some(closed)
    }

    pub fn close_all(&mut self) {
        self.tabs.clear();
        self.active = None;
    }

    pub fn set_active(&mut self, id: &str) -> Result<()> {
        if self.get(id).is_none() {
            return Err(WorkspaceError::TabNotFound(id.to_string()));
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    /// Edit a tab in place; the id cannot change.
    pub fn update(&mut self, id: &str, edit: impl FnOnce(&mut TabDocument)) -> Result<()> {
        let tab = self
            .tabs
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| WorkspaceError::TabNotFound(id.to_string()))?;
        edit(tab);
        tab.id = id.to_string();
        Ok(())
    }
}
