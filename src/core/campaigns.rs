//! Campaigns
//!
//! Campaign list backed by the Notion campaigns database. An empty result is
//! shown as empty; there is no default set.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::gateway::{Gateway, Operation};
use crate::core::resource::{extract_list, Clock, ResourceHook, ResourceSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

pub struct CampaignSource;

impl ResourceSource for CampaignSource {
    type Item = Campaign;
    type Key = ();

    fn name(&self) -> &'static str {
        "campaigns"
    }

    fn operation(&self) -> Operation {
        Operation::FetchCampaigns
    }

    fn payload(&self, query: &str, _key: &()) -> Option<Value> {
        let mut body = Map::new();
        if !query.is_empty() {
            body.insert("search".to_string(), Value::String(query.to_string()));
        }
        Some(Value::Object(body))
    }

    fn parse(&self, data: Value) -> Result<Vec<Campaign>, String> {
        extract_list(data, "campaigns")
    }
}

pub type CampaignsHook = ResourceHook<CampaignSource>;

impl CampaignsHook {
    pub fn campaigns(
        gateway: Arc<dyn Gateway>,
        clock: Arc<dyn Clock>,
        search_debounce: Duration,
    ) -> Self {
        ResourceHook::new(CampaignSource, gateway, clock, (), search_debounce)
    }

    pub fn find(&self, id: &str) -> Option<&Campaign> {
        self.items().iter().find(|c| c.id == id)
    }
}
