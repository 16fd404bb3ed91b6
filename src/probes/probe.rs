//! # Probe contract and output sink.
//!
//! This module defines the [`Probe`] trait every data-collection unit implements,
//! the shared handle types [`ProbeRef`] / [`ProbeFactory`], and the [`Emitter`]
//! handed to [`Probe::run`].
//!
//! The manager calls `name`, `load`, `run` and `close` and nothing else.
//!
//! ## Call order
//! ```text
//! factory() ──► load() ──► run(ctx, out)  (own task, until ctx is cancelled)
//!                              │
//!           stop: ctx.cancel() ┴──► close()   (may overlap run's own cleanup)
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, EmitError};
use crate::telemetry::TelemetryEvent;

/// Shared handle to a probe instance.
pub type ProbeRef = Arc<dyn Probe>;

/// Zero-argument constructor producing a fresh probe instance.
pub type ProbeFactory = Arc<dyn Fn() -> ProbeRef + Send + Sync>;

/// # Pluggable telemetry producer.
///
/// Implementations keep their resources behind interior mutability: `close` can be
/// invoked while `run` is still unwinding after cancellation.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use probevisor::{BoxError, Emitter, Probe};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Probe for Echo {
///     fn name(&self) -> &str { "echo" }
///
///     async fn load(&self) -> Result<(), BoxError> { Ok(()) }
///
///     async fn run(&self, ctx: CancellationToken, out: Emitter) -> Result<(), BoxError> {
///         if out.emit_data("x").await.is_err() {
///             return Ok(());
///         }
///         ctx.cancelled().await;
///         Ok(())
///     }
///
///     async fn close(&self) -> Result<(), BoxError> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    /// Stable identifier; matches the name the factory is registered under.
    fn name(&self) -> &str;

    /// One-time preparation. On error the probe is never started.
    async fn load(&self) -> Result<(), BoxError>;

    /// Main body. Blocks until it fails or `ctx` is cancelled, and stops emitting
    /// once it returns.
    async fn run(&self, ctx: CancellationToken, out: Emitter) -> Result<(), BoxError>;

    /// Releases what `load`/`run` acquired.
    async fn close(&self) -> Result<(), BoxError>;
}

/// Output sink for one running probe.
///
/// Emission waits for channel capacity (backpressure) and gives up only when the
/// probe's cancellation fires or the consumer is gone.
#[derive(Clone, Debug)]
pub struct Emitter {
    probe: Arc<str>,
    tx: mpsc::Sender<TelemetryEvent>,
    token: CancellationToken,
}

impl Emitter {
    /// Creates an emitter bound to `probe`'s cancellation token.
    pub fn new(
        probe: impl Into<Arc<str>>,
        tx: mpsc::Sender<TelemetryEvent>,
        token: CancellationToken,
    ) -> Self {
        Self {
            probe: probe.into(),
            tx,
            token,
        }
    }

    /// Sends `event`, waiting while the channel is full.
    ///
    /// Returns [`EmitError::Canceled`] if cancellation fires first (including when it
    /// already fired) and [`EmitError::Closed`] if the receiver was dropped.
    pub async fn emit(&self, event: TelemetryEvent) -> Result<(), EmitError> {
        if self.token.is_cancelled() {
            return Err(EmitError::Canceled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(EmitError::Canceled),
            res = self.tx.send(event) => res.map_err(|_| EmitError::Closed),
        }
    }

    /// Emits `data` stamped with this probe's name and the current time.
    pub async fn emit_data(&self, data: impl Into<String>) -> Result<(), EmitError> {
        self.emit(TelemetryEvent::now(&*self.probe, data)).await
    }

    /// Name of the probe this emitter belongs to.
    pub fn probe_name(&self) -> &str {
        &self.probe
    }

    /// True once the probe has been told to stop.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
