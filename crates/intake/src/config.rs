//! Ingress configuration.
//!
//! Loaded once at startup from a YAML file or, when none is given, from a
//! built-in template interpolated against the process environment. The
//! result is immutable and shared behind an `Arc`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use snafu::prelude::*;

use landing_core::error::{ConfigError, DuplicateAreaSnafu, EmptyValueSnafu, MultipleErrorsSnafu};
use landing_core::storage::BackendConfig;
use landing_core::{MetricsConfig, load_yaml, parse_socket_addr};

/// Configuration used when no file is passed, driven by environment variables.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"
storage:
  url: "${INTAKE_STORAGE_URL:-}"
  account: "${STORAGE_ACCOUNT_NAME:-changeme-storage}"
  account_url: "${ACCOUNT_URL:-}"
  container: "${BLOB_CONTAINER_NAME:-data-staging}"
required_role: "${REQUIRED_ROLE:-DataIngest.Write}"
bind_address: "${INTAKE_BIND_ADDRESS:-0.0.0.0:8080}"
areas:
  transaction: transaction
  merchant_fee: merchant_fee
  entity: entity
metrics:
  address: "${METRICS_ADDRESS:-0.0.0.0:9090}"
"#;

/// Where accepted payloads are written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Full intake root URL. Overrides the account fields when set.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub account: String,
    /// Blob endpoint, e.g. `https://acct.blob.core.windows.net`, a sovereign
    /// cloud host, or an emulator such as `http://127.0.0.1:10000/devstoreaccount1`.
    #[serde(default)]
    pub account_url: String,
    #[serde(default)]
    pub container: String,
    /// Extra object_store options (credentials, emulator flags).
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

impl StorageConfig {
    /// Intake root URL derived from the configured fields.
    pub fn resolve_url(&self) -> String {
        let url = self.url.trim();
        if !url.is_empty() {
            return url.to_string();
        }

        let account_url = self.account_url.trim().trim_end_matches('/');
        let endpoint = if account_url.is_empty() {
            format!("https://{}.blob.core.windows.net", self.account.trim())
        } else {
            account_url.to_string()
        };
        format!("{}/{}", endpoint, self.container.trim().trim_matches('/'))
    }
}

/// Table name to intake folder mapping.
///
/// Keys are matched case-insensitively; folder names are stored without
/// surrounding slashes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "IndexMap<String, String>")]
pub struct AreaMap {
    folders: IndexMap<String, String>,
}

impl AreaMap {
    /// Folder for `table`, if it is a configured area.
    pub fn folder_for(&self, table: &str) -> Option<&str> {
        self.folders
            .get(&table.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.folders.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

impl TryFrom<IndexMap<String, String>> for AreaMap {
    type Error = ConfigError;

    fn try_from(raw: IndexMap<String, String>) -> Result<Self, Self::Error> {
        let mut folders = IndexMap::with_capacity(raw.len());
        for (table, folder) in raw {
            let table = table.trim().to_lowercase();
            let folder = folder.trim().trim_matches('/').to_string();
            ensure!(!table.is_empty(), EmptyValueSnafu { field: "areas key" });
            ensure!(
                !folder.is_empty(),
                EmptyValueSnafu {
                    field: format!("areas.{table}"),
                }
            );
            ensure!(
                !folders.contains_key(&table),
                DuplicateAreaSnafu { area: table }
            );
            folders.insert(table, folder);
        }
        Ok(Self { folders })
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for AreaMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self {
            folders: iter
                .into_iter()
                .map(|(table, folder)| (table.to_lowercase(), folder.to_string()))
                .collect(),
        }
    }
}

/// Root configuration for the ingress service.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngressConfig {
    pub storage: StorageConfig,
    pub required_role: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    pub areas: AreaMap,
    /// Prometheus endpoint. Omit to run without a metrics server.
    #[serde(default)]
    pub metrics: Option<MetricsConfig>,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

impl IngressConfig {
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

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_socket_addr(&self.bind_address)
    }

    /// Check every startup invariant, reporting all failures together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.required_role.trim().is_empty() {
            errors.push("'required_role' cannot be empty".to_string());
        }
        if self.areas.is_empty() {
            errors.push("'areas' must define at least one table".to_string());
        }
        if self.storage.url.trim().is_empty() {
            if self.storage.container.trim().is_empty() {
                errors.push("'storage.container' cannot be empty".to_string());
            }
            if self.storage.account.trim().is_empty() && self.storage.account_url.trim().is_empty()
            {
                errors.push("'storage.account' or 'storage.account_url' must be set".to_string());
            }
        }
        if let Err(e) = BackendConfig::parse_url(&self.storage.resolve_url()) {
            errors.push(format!("Storage location is not usable: {e}"));
        }
        if let Err(e) = self.bind_addr() {
            errors.push(e.to_string());
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
