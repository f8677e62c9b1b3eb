//! Encounter Generation
//!
//! Request/result model for the `generate-encounter` function and the flow
//! that turns a generation call into a workspace tab. Balancing and creature
//! selection happen server-side; this module only shapes the request, times
//! the call and decodes what comes back.
//!
//! ## Example
//!
//! ```rust,ignore
//! let service = EncounterService::new(gateway);
//! let request = EncounterRequest::new(4, 5)
//!     .with_environment("Forest")
//!     .with_cr_range("1/2".parse()?, "5".parse()?);
//!
//! let tab = service.generate(&request).await;
//! workspace.add_tab(tab)?;
//! ```

pub mod challenge;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::environments::ANY_ENVIRONMENT;
use crate::core::gateway::{Gateway, Operation};
use crate::core::workspace::{TabDocument, TabKind};

pub use challenge::ChallengeRating;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum EncounterError {
    #[error("Invalid challenge rating: {0}")]
    InvalidChallengeRating(String),

    #[error("Invalid CR range: min {min} is above max {max}")]
    InvalidCrRange {
        min: ChallengeRating,
        max: ChallengeRating,
    },

    #[error("Party size must be at least 1")]
    EmptyParty,

    #[error("Party level must be between 1 and 20, got {0}")]
    InvalidPartyLevel(u8),

    #[error("Unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

// ============================================================================
// Request
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Deadly,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Deadly => "deadly",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = EncounterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "deadly" => Ok(Self::Deadly),
            other => Err(EncounterError::UnknownDifficulty(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncounterRequest {
    /// `None` (or "Any") lets the backend draw from every environment.
    pub environment: Option<String>,
    pub min_cr: ChallengeRating,
    pub max_cr: ChallengeRating,
    pub party_size: u8,
    pub party_level: u8,
    pub difficulty: Difficulty,
    pub creature_types: Vec<String>,
    pub include_treasure: bool,
}

impl EncounterRequest {
    pub fn new(party_size: u8, party_level: u8) -> Self {
        Self {
            environment: None,
            min_cr: ChallengeRating::default(),
            max_cr: ChallengeRating::MAX,
            party_size,
            party_level,
            difficulty: Difficulty::default(),
            creature_types: Vec::new(),
            include_treasure: true,
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        let environment = environment.into();
        self.environment = (environment != ANY_ENVIRONMENT && !environment.is_empty())
            .then_some(environment);
        self
    }

    pub fn with_cr_range(mut self, min: ChallengeRating, max: ChallengeRating) -> Self {
        self.min_cr = min;
        self.max_cr = max;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_creature_types(mut self, types: Vec<String>) -> Self {
        self.creature_types = types;
        self
    }

    pub fn validate(&self) -> Result<(), EncounterError> {
        if self.min_cr > self.max_cr {
            return Err(EncounterError::InvalidCrRange {
                min: self.min_cr,
                max: self.max_cr,
            });
        }
        if self.party_size == 0 {
            return Err(EncounterError::EmptyParty);
        }
        if !(1..=20).contains(&self.party_level) {
            return Err(EncounterError::InvalidPartyLevel(self.party_level));
        }
        Ok(())
    }

    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "minCR": self.min_cr.as_f64(),
            "maxCR": self.max_cr.as_f64(),
            "partySize": self.party_size,
            "partyLevel": self.party_level,
            "difficulty": self.difficulty,
            "includeTreasure": self.include_treasure,
        });
        if let Some(environment) = &self.environment {
            payload["environment"] = json!(environment);
        }
        if !self.creature_types.is_empty() {
            payload["creatureTypes"] = json!(self.creature_types);
        }
        payload
    }

    fn title(&self) -> String {
        let environment = self.environment.as_deref().unwrap_or(ANY_ENVIRONMENT);
        format!("{environment} (CR {}-{})", self.min_cr, self.max_cr)
    }
}

// ============================================================================
// Result
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterCreature {
    pub name: String,
    /// Missing or off-table ratings decode as `None`.
    #[serde(
        default,
        alias = "challengeRating",
        deserialize_with = "lenient_cr",
        skip_serializing_if = "Option::is_none"
    )]
    pub cr: Option<ChallengeRating>,
    #[serde(default = "one", alias = "quantity")]
    pub count: u32,
    /// XP for a single creature, when the backend reports it.
    #[serde(default)]
    pub xp: Option<u32>,
    #[serde(default, alias = "type")]
    pub creature_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

fn one() -> u32 {
    1
}

fn lenient_cr<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ChallengeRating>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

impl EncounterCreature {
    /// XP for the whole group. Unknown ratings without a reported XP count
    /// as zero; the product saturates.
    pub fn total_xp(&self) -> u32 {
        let each = self.xp.or_else(|| self.cr.map(ChallengeRating::xp)).unwrap_or(0);
        each.saturating_mul(self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicItem {
    pub name: String,
    #[serde(default)]
    pub rarity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Treasure {
    /// Coin totals keyed by denomination (`gp`, `sp`, ...).
    pub coins: std::collections::BTreeMap<String, u64>,
    pub items: Vec<String>,
    pub magic_items: Vec<MagicItem>,
}

impl Treasure {
    pub fn is_empty(&self) -> bool {
        self.coins.values().all(|v| *v == 0) && self.items.is_empty() && self.magic_items.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncounterResult {
    #[serde(alias = "monsters")]
    pub creatures: Vec<EncounterCreature>,
    pub treasure: Treasure,
    #[serde(rename = "totalXP", alias = "totalXp")]
    pub total_xp: Option<u32>,
    #[serde(rename = "adjustedXP", alias = "adjustedXp")]
    pub adjusted_xp: Option<u32>,
    pub difficulty: Option<String>,
    pub logs: Vec<String>,
}

impl EncounterResult {
    /// Backend total, or the sum over creatures when it was left out.
    pub fn total_xp(&self) -> u32 {
        self.total_xp.unwrap_or_else(|| {
            self.creatures
                .iter()
                .map(EncounterCreature::total_xp)
                .fold(0, u32::saturating_add)
        })
    }

    pub fn creature_count(&self) -> u32 {
        self.creatures
            .iter()
            .map(|c| c.count)
            .fold(0, u32::saturating_add)
    }

    /// Decode an encounter tab's payload; the result may sit under
    /// `encounter`.
    pub fn from_value(data: &Value) -> Result<Self, String> {
        let inner = data.get("encounter").unwrap_or(data);
        serde_json::from_value(inner.clone()).map_err(|e| format!("Invalid encounter: {e}"))
    }
}

// ============================================================================
// Service
// ============================================================================

pub struct EncounterService {
    gateway: Arc<dyn Gateway>,
}

impl EncounterService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Generate an encounter and wrap it in a tab. Failures end up in the
    /// tab's `error`; this never fails.
    pub async fn generate(&self, request: &EncounterRequest) -> TabDocument {
        let mut tab = TabDocument::new(TabKind::Encounter, request.title(), Value::Null);
        tab.logs.push(format!(
            "Requested {} encounter for {} level {} characters",
            request.difficulty.as_str(),
            request.party_size,
            request.party_level
        ));

        if let Err(e) = request.validate() {
            warn!(error = %e, "rejected encounter request");
            return tab.with_error(e.to_string());
        }

        let start = Instant::now();
        let result = self
            .gateway
            .call(Operation::GenerateEncounter, Some(request.to_payload()))
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        tab.generation_time_ms = Some(elapsed_ms);

        match result.into_result() {
            Ok(data) => {
                match EncounterResult::from_value(&data) {
                    Ok(encounter) => {
                        tab.logs.extend(encounter.logs.iter().cloned());
                        info!(
                            creatures = encounter.creature_count(),
                            total_xp = encounter.total_xp(),
                            elapsed_ms,
                            "encounter generated"
                        );
                    }
                    Err(e) => {
                        warn!(error = %e, "encounter payload did not decode");
                        tab.error = Some(e);
                    }
                }
                tab.data = data;
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms, "encounter generation failed");
                tab.error = Some(e);
            }
        }
        tab
    }
}

/// Magic-item summary for a successful encounter tab, if it dropped any.
pub fn magic_items_tab(encounter_tab: &TabDocument) -> Option<TabDocument> {
    if encounter_tab.kind != TabKind::Encounter || encounter_tab.is_error() {
        return None;
    }
    let encounter = EncounterResult::from_value(&encounter_tab.data).ok()?;
    if encounter.treasure.magic_items.is_empty() {
        return None;
    }

    let items = serde_json::to_value(&encounter.treasure.magic_items).ok()?;
    Some(TabDocument::new(
        TabKind::MagicItems,
        format!("Magic Items: {}", encounter_tab.title),
        json!({
            "sourceTabId": encounter_tab.id,
            "magicItems": items,
        }),
    ))
}
