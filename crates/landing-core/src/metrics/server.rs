//! Prometheus recorder and scrape endpoint.
//!
//! The recorder is process-wide and installed once. `init_test()` tolerates
//! concurrent test threads racing to install it.

use axum::extract::State;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use snafu::prelude::*;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::{
    AlreadyInitializedSnafu, BindSnafu, MetricsError, NotInitializedSnafu, PrometheusInitSnafu,
};

/// Default metrics address.
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9090";

/// Histogram buckets in seconds, from fast ingest requests to slow commits.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

static CONTROLLER: OnceLock<MetricsController> = OnceLock::new();

/// Handle to the installed Prometheus recorder.
pub struct MetricsController {
    handle: PrometheusHandle,
}

fn install_recorder() -> Result<&'static MetricsController, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets(DURATION_BUCKETS)
        .context(PrometheusInitSnafu)?
        .install_recorder()
        .context(PrometheusInitSnafu)?;

    CONTROLLER
        .set(MetricsController { handle })
        .map_err(|_| AlreadyInitializedSnafu.build())?;
    MetricsController::get()
}

/// Install the recorder and serve `/metrics` and `/health` on `addr`.
///
/// The listener is bound before returning, so an unusable address is a
/// startup error rather than a background log line.
pub async fn init_global(addr: SocketAddr) -> Result<(), MetricsError> {
    let listener = TcpListener::bind(addr).await.context(BindSnafu { addr })?;
    let controller = install_recorder()?;

    let app = Router::new()
        .route("/metrics", get(render_metrics))
        .route("/health", get(health))
        .with_state(controller.handle.clone());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    info!(%addr, "Metrics server started");
    Ok(())
}

/// Install the recorder without serving it. Safe to call from many test threads.
pub fn init_test() {
    if install_recorder().is_err() {
        while CONTROLLER.get().is_none() {
            std::hint::spin_loop();
        }
    }
}

impl MetricsController {
    /// The installed controller, if any.
    pub fn get() -> Result<&'static Self, MetricsError> {
        CONTROLLER.get().context(NotInitializedSnafu)
    }

    /// Render metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

async fn health() -> &'static str {
    "ok\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit;
    use crate::metrics::events::{
        AreaLoadCompleted, AreaLoadStatus, IngestRequestCompleted, RequestOutcome,
    };
    use std::time::Duration;

    #[test]
    fn test_init_test_is_idempotent() {
        init_test();
        init_test();

        assert!(MetricsController::get().is_ok());
    }

    #[test]
    fn test_events_render() {
        init_test();

        emit!(IngestRequestCompleted {
            outcome: RequestOutcome::Forbidden,
            duration: Duration::from_millis(3),
        });
        emit!(AreaLoadCompleted {
            status: AreaLoadStatus::Empty,
            area: "entity".to_string(),
        });

        let output = MetricsController::get().unwrap().render();
        assert!(output.contains("intake_requests_total"));
        assert!(output.contains("outcome=\"forbidden\""));
        assert!(output.contains("lander_area_loads_total"));
    }
}
