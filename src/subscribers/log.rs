//! # LogWriter: lifecycle events as `tracing` records.
//!
//! Transitions are logged at `info`, failures and dropped errors at `warn`/`error`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO probevisor: probe registered probe="heartbeat"
//! INFO probevisor: probe loaded probe="heartbeat"
//! INFO probevisor: probe running probe="heartbeat"
//! WARN probevisor: probe error reported probe="fileopen" label="probe_load_failed" reason="EPERM"
//! INFO probevisor: probe stopping probe="heartbeat"
//! INFO probevisor: probe closed probe="heartbeat"
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::lifecycle::{LifecycleEvent, LifecycleKind};
use crate::subscribers::Subscribe;

/// Lifecycle subscriber that writes through `tracing`.
#[derive(Default, Debug, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &LifecycleEvent) {
        let probe = e.probe.as_deref().unwrap_or("-");
        let label = e.label.unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            LifecycleKind::ProbeRegistered => {
                info!(target: "probevisor", probe, reason, "probe registered")
            }
            LifecycleKind::ProbeLoaded => info!(target: "probevisor", probe, "probe loaded"),
            LifecycleKind::ProbeRunning => info!(target: "probevisor", probe, "probe running"),
            LifecycleKind::ProbeStopping => info!(target: "probevisor", probe, "probe stopping"),
            LifecycleKind::ProbeClosed => info!(target: "probevisor", probe, "probe closed"),
            LifecycleKind::ProbeFailed => {
                error!(target: "probevisor", probe, label, reason, "probe failed")
            }
            LifecycleKind::ErrorReported => {
                warn!(target: "probevisor", probe, label, reason, "probe error reported")
            }
            LifecycleKind::ErrorDropped => {
                warn!(target: "probevisor", probe, label, reason, "error channel full, error dropped")
            }
            LifecycleKind::ShutdownStarted => info!(target: "probevisor", "shutdown started"),
            LifecycleKind::ShutdownFinished => info!(target: "probevisor", "shutdown finished"),
            LifecycleKind::SubscriberPanicked => {
                error!(target: "probevisor", subscriber = probe, reason, "subscriber panicked")
            }
            LifecycleKind::SubscriberOverflow => {
                warn!(target: "probevisor", subscriber = probe, reason, "subscriber dropped event")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
