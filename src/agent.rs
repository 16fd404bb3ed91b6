//! # Process-level agent runner.
//!
//! Wires a [`ProbeManager`] for a long-running host agent:
//!
//! ```text
//! registry ──► builder(+LogWriter) ──► reconcile(all names → true)
//!                                          │
//!   drain task: events ──► sink            │   errors ──► tracing
//!                                          ▼
//!                             stop future (signal) resolves
//!                                          ▼
//!                                cancel root ──► shutdown()
//!                                          ▼
//!                        drain remaining output (bounded wait)
//! ```
//!
//! Every registered probe is enabled on first start.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::{ManagerChannels, ProbeManager, ProbeRegistry, wait_for_shutdown_signal};
use crate::error::ProbeError;
use crate::subscribers::{LogWriter, Subscribe};
use crate::telemetry::TelemetryEvent;

/// How long the runner waits for in-flight output after shutdown.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Runs every probe in `registry` until SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere).
///
/// Telemetry goes to `sink`; errors are logged. Returns `Err` only if the signal
/// handlers could not be installed, and even then shuts down cleanly first.
pub async fn run<S>(registry: ProbeRegistry, cfg: Config, sink: S) -> io::Result<()>
where
    S: FnMut(TelemetryEvent) + Send + 'static,
{
    run_until(registry, cfg, sink, async {
        let signal = wait_for_shutdown_signal().await?;
        info!(signal, "shutdown signal received");
        Ok::<(), io::Error>(())
    })
    .await
}

/// Like [`run`], but stops when `stop` resolves instead of on an OS signal.
pub async fn run_until<S, F>(registry: ProbeRegistry, cfg: Config, sink: S, stop: F) -> io::Result<()>
where
    S: FnMut(TelemetryEvent) + Send + 'static,
    F: Future<Output = io::Result<()>>,
{
    let desired: Vec<(String, bool)> = registry.names().into_iter().map(|n| (n, true)).collect();
    let (mgr, channels) = ProbeManager::builder(cfg)
        .with_registry(registry)
        .with_subscribers(vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>])
        .build();

    let drain = tokio::spawn(drain(channels, sink));

    info!(probes = desired.len(), "starting probes");
    mgr.reconcile(desired).await;

    let stopped = stop.await;
    if let Err(e) = &stopped {
        warn!(error = %e, "stop trigger failed, shutting down");
    }

    mgr.cancel();
    mgr.shutdown().await;
    drop(mgr);

    match time::timeout(DRAIN_GRACE, drain).await {
        Ok(Ok(())) => debug!("output drained"),
        Ok(Err(e)) => warn!(error = %e, "drain task failed"),
        Err(_) => warn!(grace = ?DRAIN_GRACE, "probes still hold the output channels, giving up on drain"),
    }
    stopped
}

/// Forwards events to `sink` and logs errors until both channels close.
async fn drain<S>(mut channels: ManagerChannels, mut sink: S)
where
    S: FnMut(TelemetryEvent),
{
    let mut events_open = true;
    let mut errors_open = true;

    while events_open || errors_open {
        tokio::select! {
            ev = channels.events.recv(), if events_open => match ev {
                Some(ev) => sink(ev),
                None => events_open = false,
            },
            err = channels.errors.recv(), if errors_open => match err {
                Some(err) => log_error(&err),
                None => errors_open = false,
            },
        }
    }
}

fn log_error(err: &ProbeError) {
    if err.is_expected() {
        debug!(label = err.as_label(), error = %err, "probe ended");
    } else {
        warn!(label = err.as_label(), error = %err, "probe error");
    }
}
