//! Storage abstraction over Azure Blob Storage and the local filesystem.
//!
//! Paths handed to and returned from [`StorageProvider`] are relative to the
//! key prefix configured in the provider URL.

mod azure;
mod local;
mod url_parser;

pub use azure::AzureConfig;
pub use local::LocalConfig;
pub use url_parser::BackendConfig;

use bytes::Bytes;
use futures::{Stream, StreamExt, future::ready};
use object_store::path::Path;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::emit;
use crate::error::{ObjectStoreSnafu, StorageError};
use crate::layout::is_intake_file;
use crate::metrics::events::{
    RequestStatus, StorageOperation, StorageRequest, StorageRequestDuration,
};

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

const JSON_CONTENT_TYPE: &str = "application/json";
const PARQUET_CONTENT_TYPE: &str = "application/vnd.apache.parquet";

/// Storage provider that abstracts over the supported storage backends.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
    pub(crate) storage_options: HashMap<String, String>,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    pub async fn for_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        match BackendConfig::parse_url(url)? {
            BackendConfig::Azure(config) => Self::construct_azure(config, options).await,
            BackendConfig::Local(config) => Self::construct_local(config).await,
        }
    }

    /// Canonical URL of the provider root, for logging.
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    /// Get storage options for external integrations (e.g., Delta Lake).
    pub fn storage_options(&self) -> &HashMap<String, String> {
        &self.storage_options
    }

    /// Get the backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Qualify a path with the configured key prefix.
    pub fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(prefix.parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    /// Get the contents of a file.
    pub async fn get(&self, path: impl Into<Path>) -> Result<Bytes, StorageError> {
        let path = path.into();
        let start = Instant::now();
        let result = self.object_store.get(&self.qualify_path(&path)).await;

        emit!(StorageRequest {
            operation: StorageOperation::Get,
            status: RequestStatus::from_result(&result),
        });
        emit!(StorageRequestDuration {
            operation: StorageOperation::Get,
            duration: start.elapsed(),
        });

        let bytes = result
            .context(ObjectStoreSnafu)?
            .bytes()
            .await
            .context(ObjectStoreSnafu)?;
        Ok(bytes)
    }

    /// Write a JSON document, replacing any existing object at `path`.
    ///
    /// Sets `Content-Type: application/json` on cloud backends.
    pub async fn put_json(&self, path: &Path, body: Bytes) -> Result<(), StorageError> {
        self.put_with_content_type(path, PutPayload::from(body), JSON_CONTENT_TYPE)
            .await
    }

    /// Put a Parquet file to a path with the correct content type.
    pub async fn put_parquet(&self, path: &Path, body: Bytes) -> Result<(), StorageError> {
        self.put_with_content_type(path, PutPayload::from(body), PARQUET_CONTENT_TYPE)
            .await
    }

    async fn put_with_content_type(
        &self,
        path: &Path,
        payload: PutPayload,
        content_type: &'static str,
    ) -> Result<(), StorageError> {
        // Local filesystem doesn't support content-type attributes
        let opts = if matches!(self.config, BackendConfig::Local(_)) {
            PutOptions::default()
        } else {
            PutOptions {
                attributes: Attributes::from_iter([(
                    Attribute::ContentType,
                    AttributeValue::from(content_type),
                )]),
                ..Default::default()
            }
        };
        self.put_payload_with_opts(path, payload, opts).await
    }

    /// Put a payload to a path with options. The default put mode overwrites.
    async fn put_payload_with_opts(
        &self,
        path: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> Result<(), StorageError> {
        let path = self.qualify_path(path);
        let start = Instant::now();
        let result = self.object_store.put_opts(&path, payload, opts).await;

        emit!(StorageRequest {
            operation: StorageOperation::Put,
            status: RequestStatus::from_result(&result),
        });
        emit!(StorageRequestDuration {
            operation: StorageOperation::Put,
            duration: start.elapsed(),
        });

        result.context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// List files under a specific prefix (relative to configured base prefix).
    ///
    /// Returns paths relative to the configured base prefix.
    pub async fn list_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<impl Stream<Item = Result<Path, object_store::Error>> + '_, StorageError> {
        emit!(StorageRequest {
            operation: StorageOperation::List,
            status: RequestStatus::Success,
        });

        // Combine the configured key prefix with the additional prefix
        let full_prefix: Path = match self.config.key() {
            Some(key) => key.parts().chain(Path::from(prefix).parts()).collect(),
            None => Path::from(prefix),
        };

        let key_part_count = self
            .config
            .key()
            .map(|key| key.parts().count())
            .unwrap_or_default();

        let list = self
            .object_store
            .list(Some(&full_prefix))
            .filter_map(move |meta| {
                let result = match meta {
                    Ok(metadata) => {
                        // Strip the base prefix from the path so callers get relative paths
                        let relative_path: Path =
                            metadata.location.parts().skip(key_part_count).collect();
                        Some(Ok(relative_path))
                    }
                    Err(err) => Some(Err(err)),
                };
                ready(result)
            });

        Ok(list)
    }
}

/// List intake files directly under each prefix.
///
/// Missing prefixes contribute nothing. Results are sorted and deduplicated
/// for consistent ordering.
pub async fn list_intake_files(
    storage: &StorageProvider,
    prefixes: &[String],
    target: &str,
) -> Result<Vec<String>, StorageError> {
    let mut files = Vec::new();
    let mut total_listed = 0;

    for prefix in prefixes {
        let mut stream = match storage.list_with_prefix(prefix).await {
            Ok(s) => s,
            Err(e) if e.is_not_found() => {
                debug!(target = %target, "Prefix not found (skipping): {}", prefix);
                continue;
            }
            Err(e) => return Err(e),
        };

        while let Some(result) = stream.next().await {
            match result {
                Ok(path) => {
                    total_listed += 1;
                    if is_intake_file(prefix, path.as_ref()) {
                        files.push(path.to_string());
                    }
                }
                Err(object_store::Error::NotFound { .. }) => {}
                Err(source) => return Err(StorageError::ObjectStore { source }),
            }
        }
    }

    debug!(
        target = %target,
        "Listed {} objects under {} prefixes, {} are intake files",
        total_listed,
        prefixes.len(),
        files.len()
    );

    files.sort();
    files.dedup();

    Ok(files)
}
