//! # Heartbeat probe.
//!
//! Emits `"heartbeat: HH:MM:SS"` (local time) once per interval until cancelled.
//! Holds no resources; `load` and `close` are no-ops.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, EmitError};
use crate::probes::probe::{Emitter, Probe, ProbeRef};
use crate::telemetry::TelemetryEvent;

/// Periodic liveness probe.
#[derive(Debug, Clone)]
pub struct HeartbeatProbe {
    interval: Duration,
}

impl HeartbeatProbe {
    /// Registry name.
    pub const NAME: &'static str = "heartbeat";

    /// Creates a heartbeat with the given tick interval (clamped to at least 1ms).
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Factory suitable for [`ProbeRegistry::register`](crate::ProbeRegistry::register).
    pub fn factory(interval: Duration) -> impl Fn() -> ProbeRef + Send + Sync + 'static {
        move || Arc::new(HeartbeatProbe::new(interval)) as ProbeRef
    }

    fn beat() -> String {
        format!("heartbeat: {}", chrono::Local::now().format("%H:%M:%S"))
    }
}

#[async_trait]
impl Probe for HeartbeatProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn load(&self) -> Result<(), BoxError> {
        Ok(())
    }

    async fn run(&self, ctx: CancellationToken, out: Emitter) -> Result<(), BoxError> {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    let event = TelemetryEvent::new(Self::NAME, Self::beat());
                    match out.emit(event).await {
                        Ok(()) => {}
                        Err(EmitError::Canceled) => return Ok(()),
                        Err(e @ EmitError::Closed) => return Err(e.into()),
                    }
                }
            }
        }
    }

    async fn close(&self) -> Result<(), BoxError> {
        Ok(())
    }
}
