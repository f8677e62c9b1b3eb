use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub loader: LoaderConfig,
    pub defaults: DefaultsConfig,
    pub logging: LoggingConfig,
}

/// Edge-function endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Project URL, e.g. `https://<project>.supabase.co`.
    pub base_url: Option<String>,
    /// Anonymous/bearer key sent with every call.
    pub api_key: Option<String>,
    /// Path segment in front of the function name.
    pub functions_path: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Resource loader timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Quiet period after the last search edit before reloading.
    pub search_debounce_ms: u64,
    /// How often `settle` polls a loader.
    pub poll_interval_ms: u64,
}

/// Data used when the backend has nothing to offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Environment names shown when `fetch-environments` fails or is empty.
    pub environments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Write JSON logs here in addition to the terminal.
    pub log_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            functions_path: "functions/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: 300,
            poll_interval_ms: 10,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            environments: [
                "Arctic",
                "Coastal",
                "Desert",
                "Forest",
                "Grassland",
                "Hill",
                "Mountain",
                "Swamp",
                "Underdark",
                "Underwater",
                "Urban",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl LoaderConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/encounter-gen/config.toml`, then
    /// apply environment overrides. A missing file means defaults; an
    /// unreadable or unparseable one also means defaults, and the error is
    /// handed back so the caller can report it once logging is up.
    pub fn load() -> (Self, Option<ConfigError>) {
        let (mut config, error) = match Self::read(&Self::config_path()) {
            Ok(config) => (config.unwrap_or_default(), None),
            Err(e) => (Self::default(), Some(e)),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        (config, error)
    }

    /// Load from an explicit file without environment overrides, falling back
    /// to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        match Self::read(config_path) {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("{e}, using defaults");
                Self::default()
            }
        }
    }

    /// Parse a config file. `Ok(None)` when the file does not exist.
    pub fn read(config_path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match std::fs::read_to_string(config_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(
                    "No config file at {}, using defaults",
                    config_path.display()
                );
                return Ok(None);
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: config_path.to_path_buf(),
                    source,
                })
            }
        };

        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded config from {}", config_path.display());
        Ok(Some(config))
    }

    /// Override gateway settings from the environment. The `SUPABASE_*`
    /// names are what the deploy scripts export.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| lookup(k).filter(|v| !v.trim().is_empty()))
        };

        if let Some(url) = first(&["ENCOUNTER_GEN_FUNCTIONS_URL", "SUPABASE_URL"]) {
            self.gateway.base_url = Some(url);
        }
        if let Some(key) = first(&["ENCOUNTER_GEN_API_KEY", "SUPABASE_ANON_KEY"]) {
            self.gateway.api_key = Some(key);
        }
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("encounter-gen").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
