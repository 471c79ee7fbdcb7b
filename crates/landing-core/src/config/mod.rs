//! Common configuration types shared between intake and lander.

mod args;
mod vars;

pub use args::CliArgs;
pub use vars::{InterpolationResult, interpolate};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{AddressParseSnafu, ConfigError, ReadFileSnafu, YamlParseSnafu};
use crate::metrics::DEFAULT_METRICS_ADDR;

/// Metrics configuration for Prometheus endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP server (default: "0.0.0.0:9090").
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            address: default_metrics_address(),
        }
    }
}

impl MetricsConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_socket_addr(&self.address)
    }
}

fn default_metrics_address() -> String {
    DEFAULT_METRICS_ADDR.to_string()
}

/// Parse a socket address, naming the offending value on failure.
pub fn parse_socket_addr(address: &str) -> Result<SocketAddr, ConfigError> {
    address.parse().context(AddressParseSnafu { address })
}

/// Interpolate environment variables into YAML text and deserialize it.
pub fn parse_yaml<T: DeserializeOwned>(contents: &str) -> Result<T, ConfigError> {
    let text = interpolate(contents).into_text()?;
    serde_yaml::from_str(&text).context(YamlParseSnafu)
}

/// Load configuration from `path`, or from `default_template` when no file is given.
///
/// The template is interpolated like a file, so a deployment configured purely
/// through environment variables needs no config file at all.
pub fn load_yaml<T: DeserializeOwned>(
    path: Option<&Path>,
    default_template: &str,
) -> Result<T, ConfigError> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
            parse_yaml(&contents)
        }
        None => parse_yaml(default_template),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        #[serde(default)]
        metrics: MetricsConfig,
    }

    #[test]
    fn test_parse_yaml_with_defaults() {
        let sample: Sample = parse_yaml("name: ${LANDING_TEST_SAMPLE_NAME:-fallback}").unwrap();
        assert_eq!(sample.name, "fallback");
        assert_eq!(sample.metrics.address, DEFAULT_METRICS_ADDR);
    }

    #[test]
    fn test_load_yaml_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name: from-file\nmetrics:\n  address: 127.0.0.1:9999").unwrap();

        let sample: Sample = load_yaml(Some(file.path()), "name: template").unwrap();
        assert_eq!(sample.name, "from-file");
        assert_eq!(
            sample.metrics.socket_addr().unwrap(),
            "127.0.0.1:9999".parse().unwrap()
        );
    }

    #[test]
    fn test_load_yaml_missing_file() {
        let err = load_yaml::<Sample>(Some(Path::new("/nonexistent/landing.yaml")), "")
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_metrics_address() {
        let config = MetricsConfig {
            address: "not-an-address".to_string(),
        };
        assert!(matches!(
            config.socket_addr(),
            Err(ConfigError::AddressParse { .. })
        ));
    }
}
