//! Delta Lake sink for area tables.
//!
//! Each append writes one Parquet file into the ingestion-date partition and
//! commits it in a single Append transaction. A schema change rides in the
//! same transaction, so new columns never appear without their rows.

mod actions;
mod table;

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use deltalake::DeltaTable;
use deltalake::arrow::array::RecordBatch;
use deltalake::arrow::datatypes::{Schema, SchemaRef};
use deltalake::kernel::{Action, Metadata};
use deltalake::kernel::transaction::CommitBuilder;
use deltalake::parquet::arrow::ArrowWriter;
use deltalake::parquet::basic::Compression;
use deltalake::parquet::file::properties::WriterProperties;
use deltalake::protocol::{DeltaOperation, SaveMode};
use object_store::path::Path;
use snafu::prelude::*;
use tracing::{debug, info};
use uuid::Uuid;

use landing_core::StorageProvider;
use landing_core::emit;
use landing_core::metrics::events::DeltaCommitCompleted;

use crate::error::{DeltaError, DeltaOperationSnafu, ParquetEncodeSnafu, UploadSnafu};
use crate::stamp::INGESTION_DATE;

use actions::{DataFile, create_add_action};
pub use table::ensure_handlers_registered;
use table::{arrow_schema_to_delta, create_table, table_arrow_schema, try_open_table};

/// Delta Lake table for one area.
pub struct DeltaSink {
    table: DeltaTable,
    storage: StorageProvider,
    schema: SchemaRef,
    /// Schema change to commit with the next append.
    pending_metadata: Option<Metadata>,
    last_version: i64,
    /// Table identifier for logs and metrics.
    table_name: String,
    area: String,
}

impl DeltaSink {
    /// Open the table at the storage root, creating it with `schema` if absent.
    pub async fn load_or_create(
        storage: StorageProvider,
        schema: &Schema,
        table_name: String,
        area: String,
    ) -> Result<Self, DeltaError> {
        ensure_handlers_registered();

        let table = match try_open_table(&storage, &table_name).await? {
            Some(table) => table,
            None => create_table(&storage, schema, &table_name).await?,
        };
        let last_version = table.version().unwrap_or(-1);
        let schema = Arc::new(table_arrow_schema(&table)?);

        Ok(Self {
            table,
            storage,
            schema,
            pending_metadata: None,
            last_version,
            table_name,
            area,
        })
    }

    /// Current table schema, partition column included.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn version(&self) -> i64 {
        self.last_version
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Replace the table schema with `new_schema`.
    ///
    /// Nothing is written until the next [`append`](Self::append), which
    /// commits the new schema together with its data.
    pub fn evolve_schema(&mut self, new_schema: Schema) -> Result<(), DeltaError> {
        use deltalake::kernel::MetadataExt;

        let added = new_schema.fields().len().saturating_sub(self.schema.fields().len());
        info!(
            target = %self.table_name,
            "Evolving schema: adding {} new fields",
            added
        );

        let delta_schema = arrow_schema_to_delta(&new_schema)?;
        let snapshot = self.table.snapshot().context(DeltaOperationSnafu)?;
        let new_metadata = snapshot
            .metadata()
            .clone()
            .with_schema(&delta_schema)
            .map_err(|source| DeltaError::DeltaOperation {
                source: deltalake::DeltaTableError::Kernel { source },
            })?;

        self.pending_metadata = Some(new_metadata);
        self.schema = Arc::new(new_schema);

        Ok(())
    }

    /// Append `batch` to the partition for `partition_value`.
    ///
    /// Returns the committed table version.
    pub async fn append(
        &mut self,
        batch: &RecordBatch,
        partition_value: &str,
    ) -> Result<i64, DeltaError> {
        let file = self.write_data_file(batch, partition_value).await?;

        let start = Instant::now();
        let snapshot = self.table.snapshot().context(DeltaOperationSnafu)?;
        let mut actions = Vec::with_capacity(2);
        if let Some(metadata) = &self.pending_metadata {
            actions.push(Action::Metadata(metadata.clone()));
        }
        actions.push(create_add_action(&file));

        let version = CommitBuilder::default()
            .with_actions(actions)
            .build(
                Some(snapshot),
                self.table.log_store(),
                DeltaOperation::Write {
                    mode: SaveMode::Append,
                    partition_by: Some(vec![INGESTION_DATE.to_string()]),
                    predicate: None,
                },
            )
            .await
            .context(DeltaOperationSnafu)?
            .version;

        self.table.load().await.context(DeltaOperationSnafu)?;
        self.last_version = version;
        if self.pending_metadata.take().is_some() {
            info!(target = %self.table_name, "Schema evolution committed at version {}", version);
        }

        emit!(DeltaCommitCompleted {
            duration: start.elapsed(),
            area: self.area.clone(),
        });
        info!(
            target = %self.table_name,
            "Committed {} records to Delta Lake, version {}",
            file.record_count,
            version
        );

        Ok(version)
    }

    /// Encode `batch` as Parquet and upload it into its partition directory.
    async fn write_data_file(
        &self,
        batch: &RecordBatch,
        partition_value: &str,
    ) -> Result<DataFile, DeltaError> {
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))
            .context(ParquetEncodeSnafu)?;
        writer.write(batch).context(ParquetEncodeSnafu)?;
        writer.close().context(ParquetEncodeSnafu)?;

        let path = format!(
            "{INGESTION_DATE}={partition_value}/part-00000-{}-c000.snappy.parquet",
            Uuid::new_v4()
        );
        let size = buffer.len();
        self.storage
            .put_parquet(&Path::from(path.as_str()), Bytes::from(buffer))
            .await
            .context(UploadSnafu { path: path.clone() })?;

        debug!(target = %self.table_name, bytes = size, "Wrote data file {}", path);

        Ok(DataFile {
            path,
            size: size as i64,
            record_count: batch.num_rows(),
            partition_value: partition_value.to_string(),
        })
    }
}
