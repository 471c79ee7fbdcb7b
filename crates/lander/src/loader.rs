//! Per-area load: discover, parse, union, stamp and append.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use deltalake::arrow::datatypes::Schema;
use serde_json::Value;
use snafu::prelude::*;
use tracing::{debug, info};

use landing_core::metrics::events::{FilesDiscovered, RecordsLanded};
use landing_core::{
    CategoryRoot, StorageProvider, StorageProviderRef, emit, intake_prefix, list_intake_files,
};

use crate::config::LanderConfig;
use crate::error::{ListSnafu, LoadError, ReadSnafu, TableStorageSnafu};
use crate::reader::parse_records;
use crate::schema::{build_batch, infer_schema, merge_schema, table_schema};
use crate::sink::DeltaSink;
use crate::stamp::{IngestionStamp, strip_metadata};

/// Result of a successful area load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Records were appended in one commit.
    Appended {
        records: usize,
        files: usize,
        version: i64,
    },
    /// Nothing to land. The table was not touched.
    Empty,
}

/// Records parsed from an area's intake files.
struct AreaRecords {
    records: Vec<Value>,
    files: usize,
}

/// Loads one area's intake files into its table.
pub struct AreaLoader {
    area: String,
    config: Arc<LanderConfig>,
    landing: StorageProviderRef,
}

impl AreaLoader {
    pub fn new(
        area: impl Into<String>,
        config: Arc<LanderConfig>,
        landing: StorageProviderRef,
    ) -> Self {
        Self {
            area: area.into(),
            config,
            landing,
        }
    }

    pub fn area(&self) -> &str {
        &self.area
    }

    /// Land every intake file of the area, stamped with `ingested_at`.
    ///
    /// Either all records are appended in one commit or none are.
    pub async fn load(&self, ingested_at: DateTime<Utc>) -> Result<LoadOutcome, LoadError> {
        let files = self.discover().await?;
        if files.is_empty() {
            info!(area = %self.area, "No intake files, skipping");
            return Ok(LoadOutcome::Empty);
        }

        let AreaRecords { records, files } = self.read_all(&files).await?;
        if records.is_empty() {
            info!(area = %self.area, "Intake files hold no records, skipping");
            return Ok(LoadOutcome::Empty);
        }

        let stamp = IngestionStamp::new(ingested_at, self.area.as_str());
        let incoming = infer_schema(&records)?;

        let mut sink = self.open_sink(&incoming).await?;
        if let Some(merged) = merge_schema(sink.schema(), &incoming) {
            sink.evolve_schema(merged)?;
        }

        let batch = build_batch(&records, sink.schema(), &stamp)?;
        let version = sink.append(&batch, &stamp.partition_value()).await?;

        emit!(RecordsLanded {
            count: records.len() as u64,
            area: self.area.clone(),
        });

        Ok(LoadOutcome::Appended {
            records: records.len(),
            files,
            version,
        })
    }

    /// Intake files across every category folder of the area.
    async fn discover(&self) -> Result<Vec<String>, LoadError> {
        let prefixes: Vec<String> = CategoryRoot::ALL
            .iter()
            .map(|category| intake_prefix(*category, &self.area))
            .collect();

        let files = list_intake_files(&self.landing, &prefixes, &self.area)
            .await
            .context(ListSnafu)?;

        emit!(FilesDiscovered {
            count: files.len() as u64,
            area: self.area.clone(),
        });
        info!(area = %self.area, files = files.len(), "Discovered intake files");

        Ok(files)
    }

    async fn read_all(&self, files: &[String]) -> Result<AreaRecords, LoadError> {
        let mut records = Vec::new();
        let mut contributing = 0;

        for path in files {
            let bytes = self
                .landing
                .get(path.as_str())
                .await
                .context(ReadSnafu { path: path.as_str() })?;

            let mut parsed = parse_records(path, &bytes)?;
            if parsed.is_empty() {
                debug!(area = %self.area, "Skipping empty intake file {}", path);
                continue;
            }

            debug!(area = %self.area, records = parsed.len(), "Parsed {}", path);
            parsed.iter_mut().for_each(strip_metadata);
            records.append(&mut parsed);
            contributing += 1;
        }

        Ok(AreaRecords {
            records,
            files: contributing,
        })
    }

    async fn open_sink(&self, incoming: &Schema) -> Result<DeltaSink, LoadError> {
        let url = self.config.table_uri(&self.area);
        let storage =
            StorageProvider::for_url_with_options(&url, self.config.storage_options.clone())
                .await
                .context(TableStorageSnafu { url: url.as_str() })?;

        let sink = DeltaSink::load_or_create(
            storage,
            &table_schema(incoming),
            self.config.table_name(&self.area),
            self.area.clone(),
        )
        .await?;
        Ok(sink)
    }
}
