//! # Supervised run task for one probe.
//!
//! [`spawn_guarded`] launches `Probe::run` on its own Tokio task behind a panic
//! boundary and reports how it ended.
//!
//! ## Outcome mapping
//! ```text
//! run → Ok(())   → RunOutcome::Completed   (nothing reported)
//! run → Err(e)   → RunOutcome::Errored     → ContextCanceled | RunFailed (per RunErrorPolicy)
//! run → panic    → RunOutcome::Panicked    → Panicked + Failed transition
//! ```
//!
//! ## Rules
//! - A panic inside the probe never escapes the task; siblings and the manager are unaffected
//! - The task never touches the active table; the entry stays until a stop removes it
//! - Errors are sent with `Reporter::send`, waiting while the error channel is full
//! - Emission goes through an [`Emitter`] bound to the probe's own token

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::RunErrorPolicy;
use crate::core::report::Reporter;
use crate::error::ProbeError;
use crate::lifecycle::{LifecycleEvent, LifecycleKind};
use crate::probes::{Emitter, ProbeRef};
use crate::subscribers::panic_message;
use crate::telemetry::TelemetryEvent;

/// How a run task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    Completed,
    Errored,
    Panicked,
}

/// Everything a run task needs.
pub(crate) struct RunContext {
    pub name: Arc<str>,
    pub probe: ProbeRef,
    pub token: CancellationToken,
    pub events: mpsc::Sender<TelemetryEvent>,
    pub reporter: Reporter,
    pub policy: RunErrorPolicy,
}

/// Spawns the probe's run task.
pub(crate) fn spawn_guarded(ctx: RunContext) -> JoinHandle<RunOutcome> {
    tokio::spawn(run_guarded(ctx))
}

async fn run_guarded(ctx: RunContext) -> RunOutcome {
    let RunContext {
        name,
        probe,
        token,
        events,
        reporter,
        policy,
    } = ctx;

    let out = Emitter::new(name.clone(), events, token.clone());
    match guard(probe.run(token.clone(), out)).await {
        Ok(Ok(())) => RunOutcome::Completed,
        Ok(Err(cause)) => {
            let cancelled = token.is_cancelled();
            debug!(probe = %name, cancelled, error = %cause, "probe run returned an error");

            if !cancelled {
                reporter.bus().publish(
                    LifecycleEvent::transition(LifecycleKind::ProbeFailed, name.clone())
                        .with_label("probe_run_failed")
                        .with_reason(cause.to_string()),
                );
            }
            let err = match policy {
                RunErrorPolicy::Classify if !cancelled => ProbeError::run_failed(&*name, cause),
                _ => ProbeError::context_canceled(&*name),
            };
            reporter.send(err).await;
            RunOutcome::Errored
        }
        Err(info) => {
            reporter
                .send_failure(ProbeError::panicked(&*name, info))
                .await;
            RunOutcome::Panicked
        }
    }
}

/// Awaits `fut` behind a panic boundary; a panic becomes its rendered message.
pub(crate) async fn guard<F>(fut: F) -> Result<F::Output, String>
where
    F: Future,
{
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(&*payload))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::BoxError;
    use crate::lifecycle::Bus;
    use crate::probes::ProbeFn;

    struct Harness {
        events: mpsc::Receiver<TelemetryEvent>,
        errors: mpsc::Receiver<ProbeError>,
        token: CancellationToken,
        join: JoinHandle<RunOutcome>,
    }

    fn launch(probe: ProbeRef, policy: RunErrorPolicy) -> Harness {
        let (ev_tx, events) = mpsc::channel(4);
        let (err_tx, errors) = mpsc::channel(4);
        let token = CancellationToken::new();
        let join = spawn_guarded(RunContext {
            name: Arc::from(probe.name()),
            probe,
            token: token.clone(),
            events: ev_tx,
            reporter: Reporter::new(err_tx, Bus::new(16)),
            policy,
        });
        Harness {
            events,
            errors,
            token,
            join,
        }
    }

    async fn outcome(join: JoinHandle<RunOutcome>) -> RunOutcome {
        tokio::time::timeout(Duration::from_secs(1), join)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn panic_becomes_probe_panic() {
        let probe: ProbeRef = ProbeFn::arc("boom", |_ctx: CancellationToken, _out: Emitter| async {
            if true {
                panic!("kaboom");
            }
            Ok::<_, BoxError>(())
        });
        let mut h = launch(probe, RunErrorPolicy::AsCanceled);

        assert_eq!(outcome(h.join).await, RunOutcome::Panicked);
        match h.errors.recv().await.unwrap() {
            ProbeError::Panicked { name, info } => {
                assert_eq!(name, "boom");
                assert_eq!(info, "kaboom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_error_reported_as_canceled_by_default() {
        let probe: ProbeRef = ProbeFn::arc("flaky", |_ctx: CancellationToken, _out: Emitter| async {
            Err::<(), BoxError>("device gone".into())
        });
        let mut h = launch(probe, RunErrorPolicy::AsCanceled);

        assert_eq!(outcome(h.join).await, RunOutcome::Errored);
        let err = h.errors.recv().await.unwrap();
        assert!(matches!(err, ProbeError::ContextCanceled { .. }));
    }

    #[tokio::test]
    async fn classify_separates_genuine_failures() {
        let probe: ProbeRef = ProbeFn::arc("flaky", |_ctx: CancellationToken, _out: Emitter| async {
            Err::<(), BoxError>("device gone".into())
        });
        let mut h = launch(probe, RunErrorPolicy::Classify);

        assert_eq!(outcome(h.join).await, RunOutcome::Errored);
        let err = h.errors.recv().await.unwrap();
        assert_eq!(err.as_label(), "probe_run_failed");
        assert!(err.to_string().contains("device gone"));
    }

    #[tokio::test]
    async fn classify_keeps_cancellation_expected() {
        let probe: ProbeRef = ProbeFn::arc("p", |ctx: CancellationToken, _out: Emitter| async move {
            ctx.cancelled().await;
            Err::<(), BoxError>("interrupted".into())
        });
        let mut h = launch(probe, RunErrorPolicy::Classify);

        h.token.cancel();
        assert_eq!(outcome(h.join).await, RunOutcome::Errored);
        assert!(h.errors.recv().await.unwrap().is_expected());
    }

    #[tokio::test]
    async fn clean_exit_reports_nothing() {
        let probe: ProbeRef = ProbeFn::arc("echo", |ctx: CancellationToken, out: Emitter| async move {
            out.emit_data("x").await?;
            ctx.cancelled().await;
            Ok::<_, BoxError>(())
        });
        let mut h = launch(probe, RunErrorPolicy::AsCanceled);

        assert_eq!(h.events.recv().await.unwrap().data, "x");
        h.token.cancel();
        assert_eq!(outcome(h.join).await, RunOutcome::Completed);
        assert!(h.errors.try_recv().is_err());
    }

    #[tokio::test]
    async fn panic_waits_for_a_full_error_channel() {
        let (ev_tx, _events) = mpsc::channel(1);
        let (err_tx, mut errors) = mpsc::channel(1);
        let reporter = Reporter::new(err_tx, Bus::new(16));
        reporter.report(ProbeError::not_found("missing"));

        let probe: ProbeRef = ProbeFn::arc("boom", |_ctx: CancellationToken, _out: Emitter| async {
            if true {
                panic!("kaboom");
            }
            Ok::<_, BoxError>(())
        });
        let join = spawn_guarded(RunContext {
            name: Arc::from("boom"),
            probe,
            token: CancellationToken::new(),
            events: ev_tx,
            reporter,
            policy: RunErrorPolicy::AsCanceled,
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!join.is_finished(), "run task must wait for error capacity");

        assert_eq!(errors.recv().await.unwrap().as_label(), "probe_not_found");
        assert_eq!(outcome(join).await, RunOutcome::Panicked);
        assert_eq!(errors.recv().await.unwrap().as_label(), "probe_panicked");
    }

    #[tokio::test]
    async fn guard_passes_values_through() {
        assert_eq!(guard(async { 7 }).await, Ok(7));
        let err = guard(async {
            if true {
                panic!("{}", String::from("owned message"));
            }
        })
        .await;
        assert_eq!(err, Err::<(), _>("owned message".to_string()));
    }
}
