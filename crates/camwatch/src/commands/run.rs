//! `camwatch run`: the monitoring daemon.

use camwatch_config::Config;
use camwatch_core::{CancellationToken, Monitor};
use tracing::{info, warn};

use crate::error::CliError;

pub async fn handle(config: &Config) -> Result<(), CliError> {
    let watchdog = config.to_watchdog_config()?;
    let monitor = Monitor::new(watchdog, config.resolver(), config.driver_control())?;

    let cancel = CancellationToken::new();
    let signals = tokio::spawn(cancel_on_signal(cancel.clone()));

    monitor.run(cancel).await;
    signals.abort();
    Ok(())
}

async fn cancel_on_signal(cancel: CancellationToken) {
    wait_for_shutdown_signal().await;
    info!("shutdown requested, finishing current tick");
    cancel.cancel();
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM, only Ctrl-C will stop the watchdog");
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        () = wait_for_ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    wait_for_ctrl_c().await;
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
