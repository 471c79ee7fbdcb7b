//! Azure Blob Storage backend implementation.

use object_store::azure::MicrosoftAzureBuilder;
use object_store::path::Path;
use object_store::{ObjectStore, RetryConfig};
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AzureConfigSnafu, StorageError};

use super::{BackendConfig, StorageProvider};

/// Azure Blob Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureConfig {
    pub account: String,
    pub container: String,
    pub key: Option<Path>,
    /// Blob endpoint when not the public cloud, e.g. a sovereign cloud or
    /// the storage emulator.
    pub endpoint: Option<String>,
}

/// object_store option key for the blob endpoint.
const ENDPOINT_OPTION: &str = "azure_storage_endpoint";
/// object_store option key permitting plain HTTP.
const ALLOW_HTTP_OPTION: &str = "allow_http";

/// Writes are attempted exactly once; a failed put surfaces to the caller.
fn no_retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 0,
        ..RetryConfig::default()
    }
}

impl StorageProvider {
    /// Build an Azure-backed provider.
    ///
    /// Credentials are resolved by `object_store` from the environment
    /// (managed identity, workload identity, or `AZURE_STORAGE_*` variables).
    /// Entries in `options` override environment values.
    pub(super) async fn construct_azure(
        config: AzureConfig,
        mut options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        // Carried as options so Delta Lake reaches the same endpoint.
        if let Some(endpoint) = &config.endpoint {
            options
                .entry(ENDPOINT_OPTION.to_string())
                .or_insert_with(|| endpoint.clone());
            if endpoint.starts_with("http://") {
                options
                    .entry(ALLOW_HTTP_OPTION.to_string())
                    .or_insert_with(|| "true".to_string());
            }
        }

        let mut builder = MicrosoftAzureBuilder::from_env()
            .with_account(&config.account)
            .with_container_name(&config.container)
            .with_retry(no_retry_config());

        for (key, value) in &options {
            if let Ok(key) = key.parse() {
                builder = builder.with_config(key, value);
            }
        }

        let canonical_url = match &config.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint, config.container),
            None => format!(
                "https://{}.blob.core.windows.net/{}",
                config.account, config.container
            ),
        };

        let object_store: Arc<dyn ObjectStore> =
            Arc::new(builder.build().context(AzureConfigSnafu)?);

        Ok(Self {
            config: BackendConfig::Azure(config),
            object_store,
            canonical_url,
            storage_options: options,
        })
    }
}
