//! Shutdown signals for the ingress server.

use tracing::{info, warn};

/// Resolve once the process is asked to stop, logging which signal arrived.
pub async fn shutdown_signal() {
    let name = wait_for_signal().await;
    info!(signal = name, "Shutdown requested");
}

/// Wait for SIGINT, SIGTERM or SIGQUIT and return its name.
#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let handlers = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
        signal(SignalKind::quit()),
    );
    let (Ok(mut sigint), Ok(mut sigterm), Ok(mut sigquit)) = handlers else {
        warn!("Unix signal handlers unavailable, waiting for Ctrl-C");
        return ctrl_c().await;
    };

    tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    "CTRL-C"
}
