//! Environments
//!
//! Environment list for the encounter filters. This is the only resource
//! that never shows an empty list: a failed or empty `fetch-environments`
//! falls back to the configured default set.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::core::gateway::{Gateway, Operation};
use crate::core::resource::{extract_list, Clock, ResourceHook, ResourceSource};

/// Label of the catch-all option shown ahead of real environments.
pub const ANY_ENVIRONMENT: &str = "Any";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
}

impl Environment {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Environment whose id is derived from its name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: slugify(&name),
            name,
        }
    }
}

fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

// The function returns either bare names or `{id, name}` records.
impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Name(String),
            Record {
                #[serde(default)]
                id: Option<String>,
                #[serde(alias = "title")]
                name: String,
            },
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Name(name) => Environment::named(name),
            Wire::Record { id: Some(id), name } if !id.is_empty() => Environment::new(id, name),
            Wire::Record { name, .. } => Environment::named(name),
        })
    }
}

/// Options for the environment picker: `"Any"` followed by every name.
pub fn environment_options(environments: &[Environment]) -> Vec<String> {
    std::iter::once(ANY_ENVIRONMENT.to_string())
        .chain(
            environments
                .iter()
                .map(|e| e.name.clone())
                .filter(|name| name != ANY_ENVIRONMENT),
        )
        .collect()
}

pub struct EnvironmentSource {
    defaults: Vec<Environment>,
}

impl EnvironmentSource {
    pub fn new(default_names: &[String]) -> Self {
        Self {
            defaults: default_names.iter().map(Environment::named).collect(),
        }
    }

    pub fn with_defaults(defaults: Vec<Environment>) -> Self {
        Self { defaults }
    }
}

impl ResourceSource for EnvironmentSource {
    type Item = Environment;
    type Key = ();

    fn name(&self) -> &'static str {
        "environments"
    }

    fn operation(&self) -> Operation {
        Operation::FetchEnvironments
    }

    fn payload(&self, query: &str, _key: &()) -> Option<Value> {
        if query.is_empty() {
            Some(json!({}))
        } else {
            Some(json!({ "search": query }))
        }
    }

    fn parse(&self, data: Value) -> Result<Vec<Environment>, String> {
        extract_list(data, "environments")
    }

    fn defaults(&self) -> Option<Vec<Environment>> {
        Some(self.defaults.clone())
    }
}

pub type EnvironmentsHook = ResourceHook<EnvironmentSource>;

impl EnvironmentsHook {
    pub fn environments(
        gateway: Arc<dyn Gateway>,
        clock: Arc<dyn Clock>,
        default_names: &[String],
        search_debounce: Duration,
    ) -> Self {
        ResourceHook::new(
            EnvironmentSource::new(default_names),
            gateway,
            clock,
            (),
            search_debounce,
        )
    }

    pub fn options(&self) -> Vec<String> {
        environment_options(self.items())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_records_and_names() {
        let source = EnvironmentSource::new(&[]);
        let parsed = source
            .parse(json!({
                "environments": [
                    {"id": "env-1", "name": "Forest"},
                    {"title": "Feywild Crossing"},
                    "Underdark"
                ]
            }))
            .unwrap();

        assert_eq!(
            parsed,
            vec![
                Environment::new("env-1", "Forest"),
                Environment::new("feywild-crossing", "Feywild Crossing"),
                Environment::new("underdark", "Underdark"),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let source = EnvironmentSource::new(&[]);
        assert!(source.parse(json!({"environments": 4})).is_err());
        assert!(source.parse(json!("Forest")).is_err());
    }

    #[test]
    fn test_missing_list_is_empty() {
        let source = EnvironmentSource::new(&[]);
        assert!(source.parse(json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_options_start_with_any() {
        let options = environment_options(&[
            Environment::named("Any"),
            Environment::named("Hill"),
            Environment::named("Swamp"),
        ]);
        assert_eq!(options, vec!["Any", "Hill", "Swamp"]);
    }

    #[test]
    fn test_defaults_come_from_config_names() {
        let source = EnvironmentSource::new(&["Astral Sea".to_string()]);
        assert_eq!(
            source.defaults(),
            Some(vec![Environment::new("astral-sea", "Astral Sea")])
        );
    }

    #[test]
    fn test_payload_carries_search() {
        let source = EnvironmentSource::new(&[]);
        assert_eq!(source.payload("", &()), Some(json!({})));
        assert_eq!(source.payload("sw", &()), Some(json!({"search": "sw"})));
    }
}
