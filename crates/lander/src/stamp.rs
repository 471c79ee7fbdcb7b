//! Ingestion metadata stamped onto every landed record.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use deltalake::arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray};
use deltalake::arrow::datatypes::{DataType, Field, TimeUnit};
use serde_json::Value;

/// Moment the run started, in UTC.
pub const INGESTION_TS: &str = "_ingestion_ts";
/// Calendar date of `_ingestion_ts`; the table's partition column.
pub const INGESTION_DATE: &str = "_ingestion_date";
/// Area the record was landed from.
pub const SOURCE_AREA: &str = "_source_area";

pub const METADATA_COLUMNS: [&str; 3] = [INGESTION_TS, INGESTION_DATE, SOURCE_AREA];

const TIMESTAMP_TZ: &str = "UTC";

pub fn is_metadata_column(name: &str) -> bool {
    METADATA_COLUMNS.contains(&name)
}

/// Drop payload keys that collide with metadata columns.
///
/// The stamped values always win over whatever the payload carried.
pub fn strip_metadata(record: &mut Value) {
    if let Value::Object(fields) = record {
        for column in METADATA_COLUMNS {
            fields.remove(column);
        }
    }
}

/// Arrow fields for the metadata columns, in table order.
pub fn metadata_fields() -> [Field; 3] {
    [
        Field::new(
            INGESTION_TS,
            DataType::Timestamp(TimeUnit::Microsecond, Some(TIMESTAMP_TZ.into())),
            true,
        ),
        Field::new(INGESTION_DATE, DataType::Date32, true),
        Field::new(SOURCE_AREA, DataType::Utf8, true),
    ]
}

/// Metadata shared by every record of one area load.
#[derive(Debug, Clone)]
pub struct IngestionStamp {
    ingested_at: DateTime<Utc>,
    area: String,
}

impl IngestionStamp {
    pub fn new(ingested_at: DateTime<Utc>, area: impl Into<String>) -> Self {
        Self {
            ingested_at,
            area: area.into(),
        }
    }

    pub fn ingested_at(&self) -> DateTime<Utc> {
        self.ingested_at
    }

    pub fn area(&self) -> &str {
        &self.area
    }

    pub fn date(&self) -> NaiveDate {
        self.ingested_at.date_naive()
    }

    /// Partition value as stored in the Delta log, `YYYY-MM-DD`.
    pub fn partition_value(&self) -> String {
        self.date().format("%Y-%m-%d").to_string()
    }

    /// Column holding the stamped value for `name`, if it is stored in data
    /// files. The partition column lives only in the Delta log.
    pub fn column(&self, name: &str, rows: usize) -> Option<ArrayRef> {
        match name {
            INGESTION_TS => Some(Arc::new(
                TimestampMicrosecondArray::from(vec![self.ingested_at.timestamp_micros(); rows])
                    .with_timezone(TIMESTAMP_TZ),
            )),
            SOURCE_AREA => Some(Arc::new(StringArray::from(vec![self.area.as_str(); rows]))),
            _ => None,
        }
    }
}
