//! Delta Lake action creation.

use std::collections::HashMap;

use chrono::Utc;
use deltalake::kernel::{Action, Add};

use crate::stamp::INGESTION_DATE;

/// A Parquet file written under the table root, ready to be committed.
#[derive(Debug, Clone)]
pub struct DataFile {
    /// Path relative to the table root.
    pub path: String,
    pub size: i64,
    pub record_count: usize,
    /// Value of the `_ingestion_date` partition.
    pub partition_value: String,
}

/// Create an Add action for a data file in an ingestion-date partition.
pub fn create_add_action(file: &DataFile) -> Action {
    let partition_values = HashMap::from([(
        INGESTION_DATE.to_string(),
        Some(file.partition_value.clone()),
    )]);

    Action::Add(Add {
        path: file.path.trim_start_matches('/').to_string(),
        size: file.size,
        partition_values,
        modification_time: Utc::now().timestamp_millis(),
        data_change: true,
        stats: Some(format!(r#"{{"numRecords":{}}}"#, file.record_count)),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_add_action_with_partition() {
        let file = DataFile {
            path: "_ingestion_date=2026-01-28/part-00000.snappy.parquet".to_string(),
            size: 1024,
            record_count: 12,
            partition_value: "2026-01-28".to_string(),
        };

        match create_add_action(&file) {
            Action::Add(add) => {
                assert_eq!(add.path, file.path);
                assert_eq!(add.size, 1024);
                assert!(add.data_change);
                assert_eq!(
                    add.partition_values.get(INGESTION_DATE),
                    Some(&Some("2026-01-28".to_string()))
                );
                assert_eq!(add.stats.as_deref(), Some(r#"{"numRecords":12}"#));
            }
            _ => panic!("Expected Add action"),
        }
    }
}
