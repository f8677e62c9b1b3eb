//! Admin and diagnostic operations against the Notion-backed functions.
//!
//! These are the calls the maintenance scripts make: schema discovery and
//! bulk data fixes. They run once and report, so they go straight through
//! the gateway instead of a resource loader.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::core::encounter::ChallengeRating;
use crate::core::gateway::{Gateway, Operation, RemoteResult};

/// Filters for `fetch-creatures`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatureFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(rename = "minCR", skip_serializing_if = "Option::is_none")]
    pub min_cr: Option<ChallengeRating>,
    #[serde(rename = "maxCR", skip_serializing_if = "Option::is_none")]
    pub max_cr: Option<ChallengeRating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creature_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

pub struct AdminClient {
    gateway: Arc<dyn Gateway>,
}

impl AdminClient {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Databases the Notion integration can see.
    pub async fn discover_databases(&self) -> RemoteResult<Value> {
        self.gateway
            .call(Operation::DiscoverNotionDatabases, None)
            .await
    }

    pub async fn database_schema(&self, database_id: &str) -> RemoteResult<Value> {
        self.gateway
            .call(
                Operation::GetNotionSchema,
                Some(json!({ "databaseId": database_id })),
            )
            .await
    }

    pub async fn fetch_creatures(&self, filter: &CreatureFilter) -> RemoteResult<Value> {
        let payload = match serde_json::to_value(filter) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "creature filter did not serialize");
                return RemoteResult::err(format!("Invalid creature filter: {e}"));
            }
        };
        self.gateway
            .call(Operation::FetchCreatures, Some(payload))
            .await
    }

    /// Normalize creature alignments. With `dry_run` the function only
    /// reports what it would change.
    pub async fn fix_alignments(&self, dry_run: bool) -> RemoteResult<Value> {
        info!(dry_run, "running alignment fix");
        self.gateway
            .call(Operation::FixAlignments, Some(json!({ "dryRun": dry_run })))
            .await
    }

    pub async fn fix_creature_types(&self, dry_run: bool) -> RemoteResult<Value> {
        info!(dry_run, "running creature type fix");
        self.gateway
            .call(
                Operation::FixCreatureTypes,
                Some(json!({ "dryRun": dry_run })),
            )
            .await
    }
}
