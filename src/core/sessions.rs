//! Sessions
//!
//! Session list scoped by campaign. Switching campaign clears the search and
//! reloads at once; search edits within a campaign go through the debounce.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::gateway::{Gateway, Operation};
use crate::core::resource::{extract_list, Clock, ResourceHook, ResourceSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub session_number: Option<u32>,
    #[serde(default)]
    pub date: Option<String>,
}

pub struct SessionSource;

impl ResourceSource for SessionSource {
    type Item = Session;
    /// Campaign id; `None` lists sessions across campaigns.
    type Key = Option<String>;

    fn name(&self) -> &'static str {
        "sessions"
    }

    fn operation(&self) -> Operation {
        Operation::FetchSessions
    }

    fn payload(&self, query: &str, campaign_id: &Option<String>) -> Option<Value> {
        let mut body = Map::new();
        if let Some(id) = campaign_id {
            body.insert("campaignId".to_string(), Value::String(id.clone()));
        }
        if !query.is_empty() {
            body.insert("search".to_string(), Value::String(query.to_string()));
        }
        Some(Value::Object(body))
    }

    fn parse(&self, data: Value) -> Result<Vec<Session>, String> {
        extract_list(data, "sessions")
    }
}

pub type SessionsHook = ResourceHook<SessionSource>;

impl SessionsHook {
    pub fn sessions(
        gateway: Arc<dyn Gateway>,
        clock: Arc<dyn Clock>,
        campaign_id: Option<String>,
        search_debounce: Duration,
    ) -> Self {
        ResourceHook::new(SessionSource, gateway, clock, campaign_id, search_debounce)
    }

    pub fn campaign_id(&self) -> Option<&str> {
        self.key().as_deref()
    }

    pub fn set_campaign(&mut self, campaign_id: Option<String>) {
        self.set_key(campaign_id);
    }
}
