//! intake: HTTP ingress that lands JSON payloads in the intake layout.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use intake::{Ingress, IngressConfig, router};
use landing_core::{CliArgs, StorageProvider, init_metrics, init_tracing, shutdown_signal};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = CliArgs::parse();

    let config = match IngressConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(metrics) = &config.metrics {
        let addr = match metrics.socket_addr() {
            Ok(addr) => addr,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        };
        if let Err(e) = init_metrics(addr).await {
            error!("Failed to start metrics server: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let storage = match StorageProvider::for_url_with_options(
        &config.storage.resolve_url(),
        config.storage.storage_options.clone(),
    )
    .await
    {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let addr = match config.bind_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        address = %addr,
        storage = storage.canonical_url(),
        areas = config.areas.len(),
        "Ingress listening"
    );

    let ingress = Arc::new(Ingress::new(&config, storage));
    if let Err(e) = axum::serve(listener, router(ingress))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Ingress stopped");
    ExitCode::SUCCESS
}
