//! lander: Batch job that lands intake files into per-area Delta tables.
//!
//! For every configured area the lander:
//! - Lists `{initial,daily,corrections}/{area}/*.json` under the landing root
//! - Parses and unions every record under one schema
//! - Stamps `_ingestion_ts`, `_ingestion_date` and `_source_area`
//! - Appends the records to `{bronze}/{area}_raw`, partitioned by ingestion date

pub mod config;
pub mod error;
pub mod loader;
pub mod orchestrator;
pub mod reader;
pub mod schema;
pub mod sink;
pub mod stamp;

// Re-export commonly used items
pub use config::LanderConfig;
pub use error::{DeltaError, LanderError, LoadError};
pub use loader::{AreaLoader, LoadOutcome};
pub use orchestrator::{AreaStatus, LandingOrchestrator, LandingReport};
pub use sink::DeltaSink;
pub use stamp::{INGESTION_DATE, INGESTION_TS, IngestionStamp, SOURCE_AREA};
