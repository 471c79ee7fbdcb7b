//! landing-core: Shared components for the intake and lander crates.
//!
//! - `layout` - The intake folder contract both stages agree on
//! - `storage/` - Storage abstraction (Azure Blob Storage, local filesystem)
//! - `metrics/` - Prometheus metrics infrastructure
//! - `config/` - YAML loading with environment variable interpolation
//! - `signal` - Signal handling for graceful shutdown
//! - `error` - Common error types

pub mod config;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod signal;
pub mod storage;
pub mod tracing;

// Re-export commonly used items
pub use config::{CliArgs, MetricsConfig, load_yaml, parse_socket_addr, parse_yaml};
pub use error::{ConfigError, MetricsError, StorageError};
pub use layout::{CategoryRoot, intake_key, intake_prefix, is_intake_file};
pub use crate::metrics::{MetricsController, init_global as init_metrics, init_test as init_metrics_test};
pub use signal::shutdown_signal;
pub use storage::{StorageProvider, StorageProviderRef, list_intake_files};
pub use crate::tracing::init_tracing;
