//! Run orchestration across areas.
//!
//! Every configured area is loaded in its own task, bounded by
//! `max_concurrent_areas`. One area failing or panicking never stops the
//! others; the outcome of each is collected into a [`LandingReport`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{error, info};

use landing_core::StorageProviderRef;
use landing_core::emit;
use landing_core::metrics::events::{AreaLoadCompleted, AreaLoadStatus};

use crate::config::LanderConfig;
use crate::error::LoadError;
use crate::loader::{AreaLoader, LoadOutcome};

/// Final state of one area after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaStatus {
    Appended {
        records: usize,
        files: usize,
        version: i64,
    },
    Empty,
    Failed {
        error: String,
    },
}

impl AreaStatus {
    fn metric_status(&self) -> AreaLoadStatus {
        match self {
            AreaStatus::Appended { .. } => AreaLoadStatus::Appended,
            AreaStatus::Empty => AreaLoadStatus::Empty,
            AreaStatus::Failed { .. } => AreaLoadStatus::Failed,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AreaStatus::Failed { .. })
    }
}

impl From<Result<LoadOutcome, LoadError>> for AreaStatus {
    fn from(result: Result<LoadOutcome, LoadError>) -> Self {
        match result {
            Ok(LoadOutcome::Appended {
                records,
                files,
                version,
            }) => AreaStatus::Appended {
                records,
                files,
                version,
            },
            Ok(LoadOutcome::Empty) => AreaStatus::Empty,
            Err(e) => AreaStatus::Failed {
                error: e.to_string(),
            },
        }
    }
}

impl fmt::Display for AreaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AreaStatus::Appended {
                records,
                files,
                version,
            } => write!(
                f,
                "appended {records} records from {files} files at version {version}"
            ),
            AreaStatus::Empty => f.write_str("nothing to land"),
            AreaStatus::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

/// Per-area outcome of a run, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct LandingReport {
    pub ingested_at: Option<DateTime<Utc>>,
    pub areas: IndexMap<String, AreaStatus>,
}

impl LandingReport {
    pub fn has_failures(&self) -> bool {
        self.areas.values().any(AreaStatus::is_failed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.areas
            .iter()
            .filter(|(_, status)| status.is_failed())
            .map(|(area, _)| area.as_str())
    }

    pub fn status(&self, area: &str) -> Option<&AreaStatus> {
        self.areas.get(area)
    }

    /// Total records appended across all areas.
    pub fn records_landed(&self) -> usize {
        self.areas
            .values()
            .map(|status| match status {
                AreaStatus::Appended { records, .. } => *records,
                _ => 0,
            })
            .sum()
    }
}

/// Drives one landing run over every configured area.
pub struct LandingOrchestrator {
    config: Arc<LanderConfig>,
    landing: StorageProviderRef,
}

impl LandingOrchestrator {
    pub fn new(config: Arc<LanderConfig>, landing: StorageProviderRef) -> Self {
        Self { config, landing }
    }

    /// Load every area once, stamping all records with the same timestamp.
    pub async fn run(&self) -> LandingReport {
        self.run_at(Utc::now()).await
    }

    /// Load every area once, stamping records with `ingested_at`.
    pub async fn run_at(&self, ingested_at: DateTime<Utc>) -> LandingReport {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_areas));
        let mut tasks: JoinSet<(String, Result<LoadOutcome, LoadError>)> = JoinSet::new();
        let mut task_areas: HashMap<Id, String> = HashMap::new();

        for area in &self.config.areas {
            let loader = AreaLoader::new(
                area.as_str(),
                Arc::clone(&self.config),
                Arc::clone(&self.landing),
            );
            let semaphore = Arc::clone(&semaphore);

            let handle = tasks.spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail.
                let _permit = semaphore.acquire_owned().await.ok();
                info!(area = %loader.area(), "Loading area");
                let result = loader.load(ingested_at).await;
                (loader.area().to_string(), result)
            });
            task_areas.insert(handle.id(), area.clone());
        }

        info!(
            areas = tasks.len(),
            ingested_at = %ingested_at,
            "Spawned area load tasks"
        );

        let mut statuses: HashMap<String, AreaStatus> = HashMap::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            let (area, status) = match joined {
                Ok((_, (area, result))) => (area, AreaStatus::from(result)),
                Err(e) => {
                    let area = task_areas.get(&e.id()).cloned().unwrap_or_default();
                    let status = AreaStatus::Failed {
                        error: format!("load task aborted: {e}"),
                    };
                    (area, status)
                }
            };

            match &status {
                AreaStatus::Failed { error } => {
                    error!(area = %area, error = %error, "Area load failed");
                }
                other => info!(area = %area, "Area load completed: {}", other),
            }
            emit!(AreaLoadCompleted {
                status: status.metric_status(),
                area: area.clone(),
            });
            statuses.insert(area, status);
        }

        let areas = self
            .config
            .areas
            .iter()
            .filter_map(|area| statuses.remove_entry(area))
            .collect();

        LandingReport {
            ingested_at: Some(ingested_at),
            areas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use landing_core::StorageProvider;
    use tempfile::TempDir;

    fn config(landing: &TempDir, bronze: &TempDir, areas: &[&str]) -> Arc<LanderConfig> {
        let yaml = format!(
            "landing_uri: {}\nbronze_uri: {}\nareas: [{}]\nmax_concurrent_areas: 2\n",
            landing.path().display(),
            bronze.path().display(),
            areas.join(", ")
        );
        Arc::new(LanderConfig::parse(&yaml).unwrap())
    }

    fn write(root: &TempDir, key: &str, contents: &str) {
        let path = root.path().join(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    async fn orchestrator(config: Arc<LanderConfig>) -> LandingOrchestrator {
        let landing =
            StorageProvider::for_url_with_options(&config.landing_uri, Default::default())
                .await
                .unwrap();
        LandingOrchestrator::new(config, Arc::new(landing))
    }

    #[test]
    fn test_report_failures() {
        let mut report = LandingReport::default();
        report.areas.insert("entity".to_string(), AreaStatus::Empty);
        assert!(!report.has_failures());

        report.areas.insert(
            "transaction".to_string(),
            AreaStatus::Failed {
                error: "boom".to_string(),
            },
        );
        assert!(report.has_failures());
        assert_eq!(report.failed().collect::<Vec<_>>(), vec!["transaction"]);
    }

    #[test]
    fn test_status_display() {
        let status = AreaStatus::Appended {
            records: 3,
            files: 2,
            version: 1,
        };
        assert_eq!(
            status.to_string(),
            "appended 3 records from 2 files at version 1"
        );
        assert_eq!(AreaStatus::Empty.to_string(), "nothing to land");
    }

    #[tokio::test]
    async fn test_run_reports_in_config_order() {
        let landing = TempDir::new().unwrap();
        let bronze = TempDir::new().unwrap();
        write(&landing, "daily/entity/a.json", r#"{"id": 1}"#);
        write(&landing, "initial/transaction/t.json", r#"[{"id": 1}, {"id": 2}]"#);

        let config = config(&landing, &bronze, &["transaction", "merchant_fee", "entity"]);
        let ts = Utc.with_ymd_and_hms(2026, 4, 1, 6, 0, 0).unwrap();
        let report = orchestrator(config).await.run_at(ts).await;

        let order: Vec<_> = report.areas.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["transaction", "merchant_fee", "entity"]);
        assert_eq!(report.status("merchant_fee"), Some(&AreaStatus::Empty));
        assert!(matches!(
            report.status("transaction"),
            Some(AreaStatus::Appended { records: 2, files: 1, .. })
        ));
        assert_eq!(report.records_landed(), 3);
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn test_failed_area_does_not_block_others() {
        let landing = TempDir::new().unwrap();
        let bronze = TempDir::new().unwrap();
        write(&landing, "daily/entity/broken.json", "{\"id\": ");
        write(&landing, "daily/merchant_fee/fees.json", r#"{"fee": 0.5}"#);

        let config = config(&landing, &bronze, &["entity", "merchant_fee"]);
        let report = orchestrator(config).await.run().await;

        assert!(report.has_failures());
        assert!(matches!(report.status("entity"), Some(AreaStatus::Failed { .. })));
        assert!(matches!(
            report.status("merchant_fee"),
            Some(AreaStatus::Appended { records: 1, .. })
        ));
        assert!(!bronze.path().join("entity_raw").exists());
    }
}
