//! # Error reporting.
//!
//! [`Reporter`] is the only writer of the manager's error channel.
//!
//! ## Rules
//! - `report`/`fail` never wait: the manager calls them while holding its lock, so a
//!   full channel drops the error (logged and published as `ErrorDropped`)
//! - `send`/`send_failure` wait for capacity like any other producer; run tasks use
//!   them since they never hold the lock
//! - Either path drops the error if the receiver is gone

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

use crate::error::ProbeError;
use crate::lifecycle::{Bus, LifecycleEvent, LifecycleKind};

#[derive(Clone)]
pub(crate) struct Reporter {
    tx: mpsc::Sender<ProbeError>,
    bus: Bus,
}

impl Reporter {
    pub fn new(tx: mpsc::Sender<ProbeError>, bus: Bus) -> Self {
        Self { tx, bus }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Sends `err` to the error channel, or drops it if the channel is full/closed.
    pub fn report(&self, err: ProbeError) {
        let notice = notice_for(LifecycleKind::ErrorReported, &err);
        match self.tx.try_send(err) {
            Ok(()) => self.bus.publish(notice),
            Err(TrySendError::Full(err)) | Err(TrySendError::Closed(err)) => {
                warn!(
                    label = err.as_label(),
                    error = %err,
                    "error channel unavailable, dropping error"
                );
                let mut notice = notice;
                notice.kind = LifecycleKind::ErrorDropped;
                self.bus.publish(notice);
            }
        }
    }

    /// Publishes the `Failed` transition for `err`'s probe, then reports it.
    pub fn fail(&self, err: ProbeError) {
        self.bus
            .publish(notice_for(LifecycleKind::ProbeFailed, &err));
        self.report(err);
    }

    /// Sends `err`, waiting while the error channel is full.
    pub async fn send(&self, err: ProbeError) {
        let mut notice = notice_for(LifecycleKind::ErrorReported, &err);
        if let Err(mpsc::error::SendError(err)) = self.tx.send(err).await {
            warn!(
                label = err.as_label(),
                error = %err,
                "error channel closed, dropping error"
            );
            notice.kind = LifecycleKind::ErrorDropped;
        }
        self.bus.publish(notice);
    }

    /// Publishes the `Failed` transition for `err`'s probe, then sends it (waiting).
    pub async fn send_failure(&self, err: ProbeError) {
        self.bus
            .publish(notice_for(LifecycleKind::ProbeFailed, &err));
        self.send(err).await;
    }
}

fn notice_for(kind: LifecycleKind, err: &ProbeError) -> LifecycleEvent {
    let mut ev = LifecycleEvent::new(kind)
        .with_label(err.as_label())
        .with_reason(err.to_string());
    if let Some(name) = err.probe_name() {
        ev = ev.with_probe(Arc::<str>::from(name));
    }
    ev
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_channel_drops_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let bus = Bus::new(8);
        let mut notices = bus.subscribe();
        let reporter = Reporter::new(tx, bus);

        reporter.report(ProbeError::not_found("a"));
        reporter.report(ProbeError::not_found("b"));

        assert_eq!(rx.recv().await.unwrap().probe_name(), Some("a"));
        assert!(rx.try_recv().is_err());

        assert_eq!(notices.recv().await.unwrap().kind, LifecycleKind::ErrorReported);
        let dropped = notices.recv().await.unwrap();
        assert_eq!(dropped.kind, LifecycleKind::ErrorDropped);
        assert_eq!(dropped.probe.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn send_waits_for_capacity() {
        let (tx, mut rx) = mpsc::channel(1);
        let reporter = Reporter::new(tx, Bus::new(8));

        reporter.report(ProbeError::not_found("a"));
        let pending = tokio::spawn({
            let reporter = reporter.clone();
            async move { reporter.send(ProbeError::panicked("b", "boom")).await }
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        assert_eq!(rx.recv().await.unwrap().probe_name(), Some("a"));
        pending.await.unwrap();
        assert_eq!(rx.recv().await.unwrap().as_label(), "probe_panicked");
    }

    #[tokio::test]
    async fn send_to_closed_channel_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let bus = Bus::new(8);
        let mut notices = bus.subscribe();
        let reporter = Reporter::new(tx, bus);

        reporter.send(ProbeError::context_canceled("p")).await;

        assert_eq!(notices.recv().await.unwrap().kind, LifecycleKind::ErrorDropped);
    }

    #[tokio::test]
    async fn fail_publishes_transition_first() {
        let (tx, _rx) = mpsc::channel(4);
        let bus = Bus::new(8);
        let mut notices = bus.subscribe();
        let reporter = Reporter::new(tx, bus);

        reporter.fail(ProbeError::close_failed("p", "busy"));

        let first = notices.recv().await.unwrap();
        assert_eq!(first.kind, LifecycleKind::ProbeFailed);
        assert_eq!(first.label, Some("probe_close_failed"));
        assert_eq!(notices.recv().await.unwrap().kind, LifecycleKind::ErrorReported);
    }
}
