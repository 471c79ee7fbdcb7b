//! lander: Appends landed intake files to per-area Delta tables.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use snafu::prelude::*;
use tracing::{error, info};

use landing_core::{CliArgs, StorageProvider, init_metrics, init_tracing};
use lander::error::{ConfigSnafu, MetricsSnafu, StorageSnafu};
use lander::{LanderConfig, LanderError, LandingOrchestrator};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = CliArgs::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Lander failed to start: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run one landing pass. Returns whether every area succeeded.
async fn run(args: CliArgs) -> Result<bool, LanderError> {
    let config = Arc::new(LanderConfig::load(args.config.as_deref()).context(ConfigSnafu)?);

    if let Some(metrics) = &config.metrics {
        let addr = metrics.socket_addr().context(ConfigSnafu)?;
        init_metrics(addr).await.context(MetricsSnafu)?;
    }

    let landing =
        StorageProvider::for_url_with_options(&config.landing_uri, config.storage_options.clone())
            .await
            .context(StorageSnafu)?;

    info!(
        landing = landing.canonical_url(),
        bronze = %config.bronze_uri,
        areas = config.areas.len(),
        "Starting landing run"
    );

    let report = LandingOrchestrator::new(Arc::clone(&config), Arc::new(landing))
        .run()
        .await;

    for (area, status) in &report.areas {
        info!(area = %area, "{}", status);
    }

    if report.has_failures() {
        let failed: Vec<_> = report.failed().collect();
        error!(
            failed = failed.len(),
            "Landing run finished with failed areas: {}",
            failed.join(", ")
        );
        return Ok(false);
    }

    info!(records = report.records_landed(), "Landing run finished");
    Ok(true)
}
