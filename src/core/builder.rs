//! # ProbeManagerBuilder: wires channels, bus, subscribers and the root token.
//!
//! [`build`](ProbeManagerBuilder::build) must be called inside a Tokio runtime: it
//! spawns the subscriber workers and the bus listener that feeds them.

use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::Config;
use crate::core::manager::ProbeManager;
use crate::core::registry::ProbeRegistry;
use crate::error::ProbeError;
use crate::lifecycle::Bus;
use crate::probes::ProbeRef;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::telemetry::TelemetryEvent;

/// Receiving ends of the manager's output channels.
#[derive(Debug)]
pub struct ManagerChannels {
    /// Telemetry from every running probe.
    pub events: mpsc::Receiver<TelemetryEvent>,
    /// Operational errors (see [`ProbeError`]).
    pub errors: mpsc::Receiver<ProbeError>,
}

/// Builder for [`ProbeManager`].
pub struct ProbeManagerBuilder {
    cfg: Config,
    registry: ProbeRegistry,
    subscribers: Vec<Arc<dyn Subscribe>>,
    parent: Option<CancellationToken>,
}

impl ProbeManagerBuilder {
    /// Creates a builder with an empty registry and no subscribers.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            registry: ProbeRegistry::new(),
            subscribers: Vec::new(),
            parent: None,
        }
    }

    /// Registers a probe factory up front (last write wins).
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> ProbeRef + Send + Sync + 'static,
    {
        self.registry.register(name, factory);
        self
    }

    /// Replaces the registry wholesale.
    pub fn with_registry(mut self, registry: ProbeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets lifecycle subscribers.
    ///
    /// Each gets a dedicated worker with a bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Makes the manager's root token a child of `parent`.
    pub fn with_parent_token(mut self, parent: CancellationToken) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Builds the manager and creates both output channels with the configured capacities.
    pub fn build(self) -> (Arc<ProbeManager>, ManagerChannels) {
        let (events_tx, events) = mpsc::channel(self.cfg.event_capacity_clamped());
        let (errors_tx, errors) = mpsc::channel(self.cfg.error_capacity_clamped());
        let mgr = self.build_with_channels(events_tx, errors_tx);
        (mgr, ManagerChannels { events, errors })
    }

    /// Builds the manager around caller-owned channel senders.
    ///
    /// Channel capacities are whatever the caller chose; `event_capacity` and
    /// `error_capacity` are ignored.
    pub fn build_with_channels(
        self,
        events: mpsc::Sender<TelemetryEvent>,
        errors: mpsc::Sender<ProbeError>,
    ) -> Arc<ProbeManager> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let root = match &self.parent {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let listener = CancellationToken::new();

        if !self.subscribers.is_empty() {
            let set = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
            subscriber_listener(&bus, set, listener.clone());
        }

        Arc::new(ProbeManager::new_internal(
            self.cfg,
            self.registry,
            events,
            errors,
            bus,
            root,
            listener,
        ))
    }
}

/// Forwards bus events to the subscriber set until `stop` fires.
///
/// Events already queued on the bus when `stop` fires are still delivered.
fn subscriber_listener(bus: &Bus, set: Arc<SubscriberSet>, stop: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged behind the lifecycle bus");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = stop.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        set.emit(&ev);
                    }
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::lifecycle::{LifecycleEvent, LifecycleKind};

    #[derive(Default)]
    struct Kinds(Mutex<Vec<LifecycleKind>>);

    #[async_trait]
    impl Subscribe for Kinds {
        async fn on_event(&self, ev: &LifecycleEvent) {
            self.0.lock().await.push(ev.kind);
        }
    }

    #[tokio::test]
    async fn parent_token_cascades_to_root() {
        let parent = CancellationToken::new();
        let (mgr, _ch) = ProbeManagerBuilder::new(Config::default())
            .with_parent_token(parent.clone())
            .build();

        parent.cancel();
        assert!(mgr.token().is_cancelled());
    }

    #[tokio::test]
    async fn subscribers_see_manager_events() {
        let kinds = Arc::new(Kinds::default());
        let (mgr, _ch) = ProbeManagerBuilder::new(Config::default())
            .with_subscribers(vec![kinds.clone() as Arc<dyn Subscribe>])
            .build();

        mgr.shutdown().await;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while kinds.0.lock().await.len() < 2 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(
            *kinds.0.lock().await,
            vec![LifecycleKind::ShutdownStarted, LifecycleKind::ShutdownFinished]
        );
    }
}
