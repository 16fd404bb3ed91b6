//! # ProbeManager: diffs desired probe state against running probes.
//!
//! The [`ProbeManager`] owns the registry, the active-probe table, the shared telemetry
//! and error channels, and the root cancellation token every probe token derives from.
//!
//! ## Architecture
//! ```text
//! reconcile({name → bool}) ──► lock(State) ──► for each entry:
//!
//!   want=true,  inactive ──► start:
//!       root cancelled?      → StartFailed
//!       registry.get(name)   → NotFound if absent
//!       factory()            → fresh instance (panic → Panicked)
//!       probe.load()         → LoadFailed / LoadRejected, table unchanged
//!       token = root.child_token()
//!       table.insert(name)   ← before the run task exists
//!       spawn_guarded(run)   → attach join handle
//!
//!   want=false, active   ──► stop:
//!       token.cancel()
//!       [stop_grace > 0]     → wait for run task, StopFailed on timeout
//!       probe.close()        → CloseFailed (entry is gone either way)
//!
//!   anything else        ──► untouched
//! ```
//!
//! ## Rules
//! - One lock orders `register`, `reconcile` and `shutdown`; the check and the mutation
//!   for a name happen under the same guard
//! - `run` executes on its own task, never under the lock
//! - No operation returns an error; every failure goes to the error channel
//! - Errors reported under the lock never block (see `Reporter`), so a full error
//!   channel cannot wedge the lock; run tasks wait for capacity instead
//! - Probe code (`factory`, `load`, `run`, `close`) only runs behind a panic boundary;
//!   the registry key is the probe's name for every table and report

use std::borrow::Borrow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::core::builder::ProbeManagerBuilder;
use crate::core::registry::ProbeRegistry;
use crate::core::report::Reporter;
use crate::core::runner::{RunContext, guard, spawn_guarded};
use crate::core::table::{ActiveProbe, ActiveTable};
use crate::error::ProbeError;
use crate::lifecycle::{Bus, LifecycleEvent, LifecycleKind};
use crate::probes::ProbeRef;
use crate::subscribers::panic_message;
use crate::telemetry::TelemetryEvent;

struct State {
    registry: ProbeRegistry,
    active: ActiveTable,
}

/// Probe lifecycle reconciler.
///
/// Built with [`ProbeManager::builder`]; shared as `Arc<ProbeManager>`.
pub struct ProbeManager {
    cfg: Config,
    state: Mutex<State>,
    events: mpsc::Sender<TelemetryEvent>,
    reporter: Reporter,
    bus: Bus,
    root: CancellationToken,
    listener: CancellationToken,
}

impl ProbeManager {
    /// Starts building a manager with `cfg`.
    pub fn builder(cfg: Config) -> ProbeManagerBuilder {
        ProbeManagerBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        registry: ProbeRegistry,
        events: mpsc::Sender<TelemetryEvent>,
        errors: mpsc::Sender<ProbeError>,
        bus: Bus,
        root: CancellationToken,
        listener: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            state: Mutex::new(State {
                registry,
                active: ActiveTable::default(),
            }),
            events,
            reporter: Reporter::new(errors, bus.clone()),
            bus,
            root,
            listener,
        }
    }

    /// Registers `factory` under `name`, replacing any earlier one.
    ///
    /// Returns `true` if a factory was replaced. Running instances are not affected.
    pub async fn register<F>(&self, name: impl Into<String>, factory: F) -> bool
    where
        F: Fn() -> ProbeRef + Send + Sync + 'static,
    {
        let name = name.into();
        let replaced = {
            let mut st = self.state.lock().await;
            st.registry.register(name.as_str(), factory)
        };

        let mut ev = LifecycleEvent::transition(LifecycleKind::ProbeRegistered, name);
        if replaced {
            ev = ev.with_reason("replaced");
        }
        self.bus.publish(ev);
        replaced
    }

    /// Applies a desired `name → should run` configuration.
    ///
    /// Names absent from `desired` are left alone. Re-applying the same configuration
    /// is a no-op for probes already running. Iteration order is the caller's.
    ///
    /// Accepts owned or borrowed pairs, e.g. `[("heartbeat", true)]` or `&HashMap<String, bool>`.
    pub async fn reconcile<I, K, B>(&self, desired: I)
    where
        I: IntoIterator<Item = (K, B)>,
        K: AsRef<str>,
        B: Borrow<bool>,
    {
        let mut st = self.state.lock().await;
        for (name, want) in desired {
            let name = name.as_ref();
            if name.trim().is_empty() {
                self.reporter.report(ProbeError::config_invalid(format!(
                    "probe name must not be empty, got {name:?}"
                )));
                continue;
            }

            match (*want.borrow(), st.active.contains(name)) {
                (true, false) => self.start(&mut st, name).await,
                (false, true) => {
                    if let Some(entry) = st.active.remove(name) {
                        self.stop(name, entry).await;
                    }
                }
                _ => {}
            }
        }
    }

    /// Stops every active probe and leaves the table empty.
    ///
    /// All tokens are cancelled before the first `close`, so probes wind down together.
    pub async fn shutdown(&self) {
        let mut st = self.state.lock().await;
        self.bus.publish(LifecycleEvent::new(LifecycleKind::ShutdownStarted));

        let entries = st.active.drain();
        for (_, entry) in &entries {
            entry.cancel.cancel();
        }
        for (name, entry) in entries {
            self.stop(&name, entry).await;
        }

        self.bus.publish(LifecycleEvent::new(LifecycleKind::ShutdownFinished));
    }

    /// Cancels the root lifetime; every probe token is a child of it.
    ///
    /// Entries stay in the table until [`shutdown`](Self::shutdown) or a stop removes them.
    /// Later starts are reported as `StartFailed`.
    pub fn cancel(&self) {
        self.root.cancel();
    }

    /// Clone of the root cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.root.clone()
    }

    /// Sorted names of running probes.
    pub async fn active(&self) -> Vec<String> {
        self.state.lock().await.active.names()
    }

    /// True if `name` is in the active table.
    pub async fn is_active(&self, name: &str) -> bool {
        self.state.lock().await.active.contains(name)
    }

    /// Sorted registered names.
    pub async fn registered(&self) -> Vec<String> {
        self.state.lock().await.registry.names()
    }

    /// Subscribes to lifecycle events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.bus.subscribe()
    }

    /// Configuration the manager was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    async fn start(&self, st: &mut State, name: &str) {
        if self.root.is_cancelled() {
            self.reporter
                .report(ProbeError::start_failed(name, "manager lifetime ended"));
            return;
        }

        let Some(factory) = st.registry.get(name).cloned() else {
            self.reporter.report(ProbeError::not_found(name));
            return;
        };

        let probe = match std::panic::catch_unwind(AssertUnwindSafe(|| factory())) {
            Ok(probe) => probe,
            Err(payload) => {
                self.reporter
                    .fail(ProbeError::panicked(name, panic_message(&*payload)));
                return;
            }
        };

        match guard(probe.load()).await {
            Ok(Ok(())) => self
                .bus
                .publish(LifecycleEvent::transition(LifecycleKind::ProbeLoaded, name)),
            Ok(Err(cause)) => {
                self.reporter.fail(ProbeError::load_failed(name, cause));
                return;
            }
            Err(info) => {
                self.reporter.fail(ProbeError::panicked(name, info));
                return;
            }
        }

        let token = self.root.child_token();
        st.active
            .insert(name, ActiveProbe::new(Arc::clone(&probe), token.clone()));
        self.bus
            .publish(LifecycleEvent::transition(LifecycleKind::ProbeRunning, name));

        let join = spawn_guarded(RunContext {
            name: Arc::from(name),
            probe,
            token,
            events: self.events.clone(),
            reporter: self.reporter.clone(),
            policy: self.cfg.run_errors,
        });
        st.active.attach(name, join);
    }

    async fn stop(&self, name: &str, entry: ActiveProbe) {
        self.bus
            .publish(LifecycleEvent::transition(LifecycleKind::ProbeStopping, name));
        entry.cancel.cancel();

        if let (Some(wait), Some(join)) = (self.cfg.stop_wait(), entry.join) {
            match time::timeout(wait, join).await {
                Ok(Ok(outcome)) => debug!(probe = name, ?outcome, "run task exited"),
                Ok(Err(e)) => self.reporter.report(ProbeError::stop_failed(name, e)),
                Err(_) => {
                    warn!(probe = name, grace = ?wait, "run task still alive, closing anyway");
                    self.reporter.report(ProbeError::stop_failed(
                        name,
                        format!("run did not exit within {wait:?}"),
                    ));
                }
            }
        }

        match guard(entry.probe.close()).await {
            Ok(Ok(())) => self
                .bus
                .publish(LifecycleEvent::transition(LifecycleKind::ProbeClosed, name)),
            Ok(Err(cause)) => self.reporter.fail(ProbeError::close_failed(name, cause)),
            Err(info) => self.reporter.fail(ProbeError::panicked(name, info)),
        }
    }
}

impl Drop for ProbeManager {
    fn drop(&mut self) {
        self.listener.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::BoxError;
    use crate::probes::{Emitter, ProbeFn};

    fn idle(name: &'static str) -> impl Fn() -> ProbeRef + Send + Sync + 'static {
        move || {
            ProbeFn::arc(name, |ctx: CancellationToken, _out: Emitter| async move {
                ctx.cancelled().await;
                Ok::<_, BoxError>(())
            }) as ProbeRef
        }
    }

    async fn next_error(rx: &mut mpsc::Receiver<ProbeError>) -> ProbeError {
        time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for error")
            .expect("error channel closed")
    }

    #[tokio::test]
    async fn register_reports_replacement() {
        let (mgr, _ch) = ProbeManager::builder(Config::default()).build();
        let mut lifecycle = mgr.subscribe();

        assert!(!mgr.register("p", idle("p")).await);
        assert!(mgr.register("p", idle("p")).await);

        let first = lifecycle.recv().await.unwrap();
        assert_eq!(first.kind, LifecycleKind::ProbeRegistered);
        assert!(first.reason.is_none());
        let second = lifecycle.recv().await.unwrap();
        assert_eq!(second.reason.as_deref(), Some("replaced"));
        assert_eq!(mgr.registered().await, vec!["p".to_string()]);
    }

    #[tokio::test]
    async fn blank_names_are_config_errors() {
        let (mgr, mut ch) = ProbeManager::builder(Config::default()).build();

        mgr.reconcile([("  ", true)]).await;

        let err = next_error(&mut ch.errors).await;
        assert!(matches!(err, ProbeError::ConfigInvalid { .. }));
        assert!(mgr.active().await.is_empty());
    }

    #[tokio::test]
    async fn cancelled_root_refuses_starts() {
        let (mgr, mut ch) = ProbeManager::builder(Config::default())
            .register("p", idle("p"))
            .build();

        mgr.cancel();
        mgr.reconcile([("p", true)]).await;

        let err = next_error(&mut ch.errors).await;
        assert_eq!(err.as_label(), "probe_start_failed");
        assert!(!mgr.is_active("p").await);
    }

    #[tokio::test]
    async fn factory_panic_is_contained() {
        let (mgr, mut ch) = ProbeManager::builder(Config::default())
            .register("bad", || -> ProbeRef { panic!("no instance today") })
            .build();

        mgr.reconcile([("bad", true)]).await;

        let err = next_error(&mut ch.errors).await;
        assert!(matches!(err, ProbeError::Panicked { .. }));
        assert!(mgr.active().await.is_empty());
    }

    struct Nameless;

    #[async_trait::async_trait]
    impl crate::probes::Probe for Nameless {
        fn name(&self) -> &str {
            panic!("name exploded")
        }

        async fn load(&self) -> Result<(), BoxError> {
            Ok(())
        }

        async fn run(&self, ctx: CancellationToken, _out: Emitter) -> Result<(), BoxError> {
            ctx.cancelled().await;
            Ok(())
        }

        async fn close(&self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn registry_key_is_the_only_name_used() {
        let (mgr, mut ch) = ProbeManager::builder(Config::default())
            .register("nameless", || Arc::new(Nameless) as ProbeRef)
            .build();

        mgr.reconcile([("nameless", true)]).await;
        assert!(mgr.is_active("nameless").await);

        mgr.shutdown().await;
        assert!(mgr.active().await.is_empty());
        assert!(ch.errors.try_recv().is_err());
    }

    #[tokio::test]
    async fn grace_timeout_reports_stop_failure_and_still_closes() {
        let closes = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&closes);
        let stubborn = move || {
            let seen = Arc::clone(&seen);
            Arc::new(
                ProbeFn::new("stubborn", |_ctx: CancellationToken, _out: Emitter| async {
                    std::future::pending::<()>().await;
                    Ok::<_, BoxError>(())
                })
                .on_close(move || {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            ) as ProbeRef
        };

        let cfg = Config {
            stop_grace: Duration::from_millis(20),
            ..Config::default()
        };
        let (mgr, mut ch) = ProbeManager::builder(cfg).register("stubborn", stubborn).build();

        mgr.reconcile([("stubborn", true)]).await;
        mgr.reconcile([("stubborn", false)]).await;

        let err = next_error(&mut ch.errors).await;
        assert_eq!(err.as_label(), "probe_stop_failed");
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(!mgr.is_active("stubborn").await);
    }

    #[tokio::test]
    async fn accepts_borrowed_maps() {
        let (mgr, _ch) = ProbeManager::builder(Config::default())
            .register("a", idle("a"))
            .register("b", idle("b"))
            .build();

        let desired: std::collections::HashMap<String, bool> =
            [("a".to_string(), true), ("b".to_string(), false)].into();
        mgr.reconcile(&desired).await;

        assert_eq!(mgr.active().await, vec!["a".to_string()]);
        mgr.shutdown().await;
        assert!(mgr.active().await.is_empty());
    }
}
