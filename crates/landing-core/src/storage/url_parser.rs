//! URL parsing for storage backends.
//!
//! Extracts backend configuration from Azure Blob Storage URLs and local
//! filesystem paths.

use object_store::path::Path;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::error::{InvalidUrlSnafu, StorageError};

use super::{AzureConfig, LocalConfig};

const ABFS_URL: &str = r"^abfss?://(?P<container>[a-z0-9\-]+)@(?P<account>[a-z0-9]+)\.dfs\.(?P<suffix>core\.[a-z0-9.\-]+)(/(?P<key>.+))?$";
const AZURE_HTTPS: &str = r"^https://(?P<account>[a-z0-9]+)\.(blob|dfs)\.(?P<suffix>core\.[a-z0-9.\-]+)/(?P<container>[a-z0-9\-]+)(/(?P<key>.+))?$";
/// Path-style endpoint with an explicit port, as served by Azurite.
const AZURE_EMULATOR: &str = r"^(?P<endpoint>https?://[A-Za-z0-9.\-]+:[0-9]+/(?P<account>[a-z0-9]+))/(?P<container>[a-z0-9\-]+)(/(?P<key>.+))?$";

/// DNS suffix of the public Azure cloud.
const PUBLIC_CLOUD_SUFFIX: &str = "core.windows.net";

const FILE_URI: &str = r"^file://(?P<path>.*)$";
const FILE_URL: &str = r"^file:(?P<path>.*)$";
const FILE_PATH: &str = r"^/(?P<path>.*)$";

static AZURE_MATCHERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [ABFS_URL, AZURE_HTTPS, AZURE_EMULATOR]
        .iter()
        .map(|p| Regex::new(p).expect("valid azure pattern"))
        .collect()
});

static LOCAL_MATCHERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [FILE_URI, FILE_URL, FILE_PATH]
        .iter()
        .map(|p| Regex::new(p).expect("valid local pattern"))
        .collect()
});

fn first_match<'u>(matchers: &[Regex], url: &'u str) -> Option<Captures<'u>> {
    matchers.iter().find_map(|r| r.captures(url))
}

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Azure(AzureConfig),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        if let Some(matches) = first_match(&AZURE_MATCHERS, url) {
            return Ok(Self::parse_azure(&matches));
        }
        if let Some(matches) = first_match(&LOCAL_MATCHERS, url) {
            return Ok(Self::parse_local(&matches));
        }

        InvalidUrlSnafu {
            url: url.to_string(),
        }
        .fail()
    }

    fn parse_azure(matches: &Captures) -> Self {
        let container = matches["container"].to_string();
        let account = matches["account"].to_string();
        let key = matches
            .name("key")
            .map(|r| r.as_str().trim_end_matches('/').into());

        // Sovereign clouds keep the host layout under another suffix; the
        // emulator spells its endpoint out in full.
        let endpoint = match (matches.name("endpoint"), matches.name("suffix")) {
            (Some(endpoint), _) => Some(endpoint.as_str().to_string()),
            (None, Some(suffix)) if suffix.as_str() != PUBLIC_CLOUD_SUFFIX => {
                Some(format!("https://{account}.blob.{}", suffix.as_str()))
            }
            _ => None,
        };

        BackendConfig::Azure(AzureConfig {
            account,
            container,
            key,
            endpoint,
        })
    }

    fn parse_local(matches: &Captures) -> Self {
        let path = &matches["path"];
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        BackendConfig::Local(LocalConfig { path, key: None })
    }

    pub(crate) fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::Azure(azure) => azure.key.as_ref(),
            BackendConfig::Local(local) => local.key.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_url_parsing() {
        let config = BackendConfig::parse_url("/lakehouse/Files/landing").unwrap();
        match config {
            BackendConfig::Local(local) => {
                assert_eq!(local.path, "/lakehouse/Files/landing");
                assert_eq!(local.key, None);
            }
            _ => panic!("Expected Local config"),
        }
    }

    #[test]
    fn test_local_file_uri() {
        let config = BackendConfig::parse_url("file:///lakehouse/Files/landing").unwrap();
        match config {
            BackendConfig::Local(local) => assert_eq!(local.path, "/lakehouse/Files/landing"),
            _ => panic!("Expected Local config"),
        }
    }

    #[test]
    fn test_local_file_url() {
        let config = BackendConfig::parse_url("file:/lakehouse/Files/landing").unwrap();
        match config {
            BackendConfig::Local(local) => assert_eq!(local.path, "/lakehouse/Files/landing"),
            _ => panic!("Expected Local config"),
        }
    }

    #[test]
    fn test_azure_abfss_url() {
        let config = BackendConfig::parse_url(
            "abfss://data-staging@ingestaccount.dfs.core.windows.net/landing",
        )
        .unwrap();
        match config {
            BackendConfig::Azure(azure) => {
                assert_eq!(azure.account, "ingestaccount");
                assert_eq!(azure.container, "data-staging");
                assert_eq!(azure.key, Some(Path::from("landing")));
            }
            _ => panic!("Expected Azure config"),
        }
    }

    #[test]
    fn test_azure_https_url_without_key() {
        let config =
            BackendConfig::parse_url("https://ingestaccount.blob.core.windows.net/data-staging")
                .unwrap();
        match config {
            BackendConfig::Azure(azure) => {
                assert_eq!(azure.account, "ingestaccount");
                assert_eq!(azure.container, "data-staging");
                assert_eq!(azure.key, None);
            }
            _ => panic!("Expected Azure config"),
        }
    }

    #[test]
    fn test_sovereign_cloud_endpoint() {
        let config =
            BackendConfig::parse_url("https://acct.blob.core.usgovcloudapi.net/data-staging/in")
                .unwrap();
        match config {
            BackendConfig::Azure(azure) => {
                assert_eq!(azure.account, "acct");
                assert_eq!(azure.container, "data-staging");
                assert_eq!(azure.key, Some(Path::from("in")));
                assert_eq!(
                    azure.endpoint.as_deref(),
                    Some("https://acct.blob.core.usgovcloudapi.net")
                );
            }
            _ => panic!("Expected Azure config"),
        }
    }

    #[test]
    fn test_emulator_endpoint() {
        let config =
            BackendConfig::parse_url("http://127.0.0.1:10000/devstoreaccount1/data-staging")
                .unwrap();
        match config {
            BackendConfig::Azure(azure) => {
                assert_eq!(azure.account, "devstoreaccount1");
                assert_eq!(azure.container, "data-staging");
                assert_eq!(azure.key, None);
                assert_eq!(
                    azure.endpoint.as_deref(),
                    Some("http://127.0.0.1:10000/devstoreaccount1")
                );
            }
            _ => panic!("Expected Azure config"),
        }
    }

    #[test]
    fn test_public_cloud_has_no_endpoint_override() {
        let config = BackendConfig::parse_url("abfss://c@acct.dfs.core.windows.net/k").unwrap();
        match config {
            BackendConfig::Azure(azure) => assert_eq!(azure.endpoint, None),
            _ => panic!("Expected Azure config"),
        }
    }

    #[test]
    fn test_invalid_url() {
        assert!(BackendConfig::parse_url("s3://bucket/path").is_err());
        assert!(BackendConfig::parse_url("relative/path").is_err());
    }
}
