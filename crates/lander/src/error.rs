//! Error types for the lander.

use snafu::prelude::*;

// Re-export common errors
pub use landing_core::error::{ConfigError, MetricsError, StorageError};

/// Errors that can occur during Delta Lake operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DeltaError {
    /// Failed to parse Delta table URL.
    #[snafu(display("Failed to parse Delta table URL: {url}"))]
    UrlParse { url: String },

    /// Delta Lake operation failed.
    #[snafu(display("Delta Lake operation failed: {source}"))]
    DeltaOperation { source: deltalake::DeltaTableError },

    /// Failed to convert between Arrow and Delta schemas.
    #[snafu(display("Failed to convert schema: {source}"))]
    SchemaConversion {
        source: deltalake::arrow::error::ArrowError,
    },

    /// Failed to build a Delta struct type.
    #[snafu(display("Failed to build Delta schema: {message}"))]
    StructType { message: String },

    /// Failed to encode the Parquet data file.
    #[snafu(display("Failed to encode Parquet file: {source}"))]
    ParquetEncode {
        source: deltalake::parquet::errors::ParquetError,
    },

    /// Failed to upload the Parquet data file.
    #[snafu(display("Failed to upload data file {path}: {source}"))]
    Upload { path: String, source: StorageError },
}

impl DeltaError {
    /// Whether this error means no table exists at the location yet.
    pub fn is_table_not_found(&self) -> bool {
        use deltalake::DeltaTableError;

        matches!(
            self,
            DeltaError::DeltaOperation {
                source: DeltaTableError::NotATable(_) | DeltaTableError::InvalidTableLocation(_)
            }
        )
    }
}

/// Errors that fail the load of a single area.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LoadError {
    /// Failed to list intake folders.
    #[snafu(display("Failed to list intake files: {source}"))]
    List { source: StorageError },

    /// Failed to read an intake file.
    #[snafu(display("Failed to read {path}: {source}"))]
    Read { path: String, source: StorageError },

    /// An intake file is not valid JSON.
    #[snafu(display("Failed to parse {path}: {source}"))]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    /// An intake file holds a record that is not a JSON object.
    #[snafu(display("{path} contains a {kind} record; only objects can be landed"))]
    NotAnObject { path: String, kind: &'static str },

    /// Failed to infer or reconcile the record schema.
    #[snafu(display("Schema error: {source}"))]
    Schema {
        source: deltalake::arrow::error::ArrowError,
    },

    /// A value could not be converted to its column type.
    #[snafu(display("Failed to convert records to the table schema: {source}"))]
    Decode {
        source: deltalake::arrow::error::ArrowError,
    },

    /// Failed to open, evolve or append to the area table.
    #[snafu(display("Delta error: {source}"))]
    Delta { source: DeltaError },

    /// Failed to open storage for the area table.
    #[snafu(display("Failed to open table storage at {url}: {source}"))]
    TableStorage { url: String, source: StorageError },
}

impl From<DeltaError> for LoadError {
    fn from(source: DeltaError) -> Self {
        LoadError::Delta { source }
    }
}

/// Errors that abort a whole run before any area is attempted.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LanderError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Storage error.
    #[snafu(display("Storage error: {source}"))]
    Storage { source: StorageError },

    /// Metrics error.
    #[snafu(display("Metrics error: {source}"))]
    Metrics { source: MetricsError },
}

impl From<ConfigError> for LanderError {
    fn from(source: ConfigError) -> Self {
        LanderError::Config { source }
    }
}

impl From<StorageError> for LanderError {
    fn from(source: StorageError) -> Self {
        LanderError::Storage { source }
    }
}
