//! Local filesystem backend, used for development roots and tests.

use object_store::local::LocalFileSystem;
use object_store::path::Path;
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{IoSnafu, ObjectStoreSnafu, StorageError};

use super::{BackendConfig, StorageProvider};

/// Local directory configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    pub path: String,
    pub key: Option<Path>,
}

impl LocalConfig {
    /// Directory the provider is rooted at.
    pub fn root(&self) -> &std::path::Path {
        std::path::Path::new(&self.path)
    }
}

impl StorageProvider {
    /// Build a provider rooted at a local directory, creating it if missing.
    ///
    /// This backend stores no content types.
    pub(super) async fn construct_local(config: LocalConfig) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(config.root())
            .await
            .context(IoSnafu)?;
        let store = LocalFileSystem::new_with_prefix(config.root()).context(ObjectStoreSnafu)?;

        Ok(Self {
            canonical_url: format!("file://{}", config.path),
            object_store: Arc::new(store),
            storage_options: HashMap::new(),
            config: BackendConfig::Local(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_root_is_created() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("bronze").join("entity_raw");

        let storage = StorageProvider::for_url_with_options(root.to_str().unwrap(), HashMap::new())
            .await
            .unwrap();

        assert!(root.is_dir());
        assert!(storage.canonical_url().starts_with("file://"));
    }
}
