//! Delta Lake table management.

use deltalake::DeltaTable;
use deltalake::arrow::datatypes::Schema;
use deltalake::operations::create::CreateBuilder;
use object_store::path::Path;
use snafu::prelude::*;
use tracing::info;
use url::Url;

use landing_core::StorageProvider;
use landing_core::storage::BackendConfig;

use crate::error::{DeltaError, DeltaOperationSnafu, UrlParseSnafu};
use crate::stamp::INGESTION_DATE;

/// Ensure Delta Lake cloud storage handlers are registered.
///
/// Idempotent.
pub fn ensure_handlers_registered() {
    deltalake::azure::register_handlers(None);
}

/// Convert an Arrow schema to a Delta schema.
pub fn arrow_schema_to_delta(schema: &Schema) -> Result<deltalake::kernel::StructType, DeltaError> {
    use deltalake::kernel::engine::arrow_conversion::TryIntoKernel;
    use deltalake::kernel::{DataType as DeltaType, StructField, StructType};

    let fields: Vec<StructField> = schema
        .fields()
        .iter()
        .map(|field| {
            let delta_type: DeltaType = field
                .data_type()
                .try_into_kernel()
                .map_err(|source| DeltaError::SchemaConversion { source })?;
            Ok(StructField::new(
                field.name(),
                delta_type,
                field.is_nullable(),
            ))
        })
        .collect::<Result<Vec<_>, DeltaError>>()?;

    StructType::try_new(fields).map_err(|e| DeltaError::StructType {
        message: e.to_string(),
    })
}

/// Read the Arrow schema of a loaded table.
pub fn table_arrow_schema(table: &DeltaTable) -> Result<Schema, DeltaError> {
    use deltalake::kernel::engine::arrow_conversion::TryIntoArrow;

    let snapshot = table.snapshot().context(DeltaOperationSnafu)?;
    snapshot
        .schema()
        .as_ref()
        .try_into_arrow()
        .map_err(|source| DeltaError::SchemaConversion { source })
}

/// Construct the Delta table URL for a storage provider rooted at the table.
pub fn build_table_url(storage: &StorageProvider) -> Result<Url, DeltaError> {
    let root = Path::default();

    let table_url = match storage.config() {
        BackendConfig::Azure(azure) => format!(
            "abfss://{}@{}.dfs.core.windows.net/{}",
            azure.container,
            azure.account,
            storage.qualify_path(&root)
        ),
        BackendConfig::Local(local) => format!("file://{}", local.path),
    };

    Url::parse(&table_url).map_err(|_| UrlParseSnafu { url: table_url }.build())
}

/// Open the table at the storage root, or `None` if there is no table yet.
pub async fn try_open_table(
    storage: &StorageProvider,
    table_name: &str,
) -> Result<Option<DeltaTable>, DeltaError> {
    let table_url = build_table_url(storage)?;

    match deltalake::open_table_with_storage_options(table_url, storage.storage_options().clone())
        .await
        .context(DeltaOperationSnafu)
    {
        Ok(table) => {
            info!(
                target = %table_name,
                "Opened existing Delta table at version {}",
                table.version().unwrap_or(-1)
            );
            Ok(Some(table))
        }
        Err(e) if e.is_table_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Create a table partitioned by ingestion date.
pub async fn create_table(
    storage: &StorageProvider,
    schema: &Schema,
    table_name: &str,
) -> Result<DeltaTable, DeltaError> {
    let table_url = build_table_url(storage)?;
    info!(target = %table_name, "Creating new Delta table at {}", table_url);

    let delta_schema = arrow_schema_to_delta(schema)?;

    CreateBuilder::new()
        .with_location(table_url.as_str())
        .with_table_name(table_name)
        .with_columns(delta_schema.fields().cloned())
        .with_partition_columns([INGESTION_DATE])
        .with_storage_options(storage.storage_options().clone())
        .await
        .context(DeltaOperationSnafu)
}
