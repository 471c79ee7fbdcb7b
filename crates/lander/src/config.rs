//! Lander configuration.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use landing_core::error::{ConfigError, MultipleErrorsSnafu};
use landing_core::{MetricsConfig, load_yaml};

/// Configuration used when no file is passed, driven by environment variables.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"
landing_uri: "${LANDING_URI}"
bronze_uri: "${BRONZE_URI}"
areas: "${LANDER_AREAS:-transaction,merchant_fee,entity}"
table_suffix: "${LANDER_TABLE_SUFFIX:-_raw}"
max_concurrent_areas: ${LANDER_MAX_CONCURRENT_AREAS:-4}
"#;

fn default_table_suffix() -> String {
    "_raw".to_string()
}

fn default_max_concurrent_areas() -> usize {
    4
}

/// Area list, either as a YAML sequence or a comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AreaList {
    List(Vec<String>),
    Csv(String),
}

impl AreaList {
    fn into_names(self) -> Vec<String> {
        let raw = match self {
            AreaList::List(names) => names,
            AreaList::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|name| name.trim().trim_matches('/').to_lowercase())
            .collect()
    }
}

fn deserialize_areas<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    AreaList::deserialize(deserializer).map(AreaList::into_names)
}

/// Root configuration for a landing run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanderConfig {
    /// Root holding the `initial`, `daily` and `corrections` folders.
    pub landing_uri: String,
    /// Root under which the per-area tables live.
    pub bronze_uri: String,
    /// Areas to land. Each name is both the intake folder and the table prefix.
    #[serde(deserialize_with = "deserialize_areas")]
    pub areas: Vec<String>,
    #[serde(default = "default_table_suffix")]
    pub table_suffix: String,
    /// Extra object_store / deltalake options (credentials, emulator flags).
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
    #[serde(default = "default_max_concurrent_areas")]
    pub max_concurrent_areas: usize,
    /// Prometheus endpoint. Omit to run without a metrics server.
    #[serde(default)]
    pub metrics: Option<MetricsConfig>,
}

impl LanderConfig {
    /// Load from `path`, or from the environment template when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = load_yaml(path, DEFAULT_CONFIG_TEMPLATE)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = landing_core::parse_yaml(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Table location for `area`.
    pub fn table_uri(&self, area: &str) -> String {
        format!(
            "{}/{}{}",
            self.bronze_uri.trim_end_matches('/'),
            area,
            self.table_suffix
        )
    }

    /// Table name for `area`, used in logs.
    pub fn table_name(&self, area: &str) -> String {
        format!("{}{}", area, self.table_suffix)
    }

    /// Check every startup invariant, reporting all failures together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.landing_uri.trim().is_empty() {
            errors.push("'landing_uri' cannot be empty".to_string());
        }
        if self.bronze_uri.trim().is_empty() {
            errors.push("'bronze_uri' cannot be empty".to_string());
        }
        if self.areas.is_empty() {
            errors.push("'areas' must name at least one area".to_string());
        }
        if self.max_concurrent_areas == 0 {
            errors.push("'max_concurrent_areas' must be at least 1".to_string());
        }

        let mut seen = HashSet::new();
        for area in &self.areas {
            if area.is_empty() {
                errors.push("'areas' contains an empty name".to_string());
            } else if area.contains('/') {
                errors.push(format!("Area '{area}' must be a single folder name"));
            } else if !seen.insert(area.as_str()) {
                errors.push(format!("Area '{area}' is defined more than once"));
            }
        }

        if let Some(metrics) = &self.metrics
            && let Err(e) = metrics.socket_addr()
        {
            errors.push(e.to_string());
        }

        match errors.len() {
            0 => Ok(()),
            _ => MultipleErrorsSnafu { errors }.fail(),
        }
    }
}
