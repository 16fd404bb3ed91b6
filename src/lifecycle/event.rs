//! # Lifecycle events emitted by the probe manager.
//!
//! [`ProbeState`] is the per-instance state machine:
//!
//! ```text
//! Registered ──► Loaded ──► Running ──► Stopping ──► Closed
//!      │            │          │                       ▲
//!      │            │          └── run error/panic ──► Failed
//!      └── load error ─────────────────────────────────► Failed
//!                                  close error ────────► Failed
//! ```
//!
//! Cancellation is the only path from `Running` to `Stopping`; reaching `Stopping`
//! always triggers `Close`.
//!
//! [`LifecycleEvent`] carries the transition (or operational notice) plus metadata:
//! a global sequence number, wall-clock time, probe name and a reason.
//!
//! ## Example
//! ```rust
//! use probevisor::{LifecycleEvent, LifecycleKind, ProbeState};
//!
//! let ev = LifecycleEvent::new(LifecycleKind::ProbeFailed)
//!     .with_probe("fileopen")
//!     .with_label("probe_load_failed")
//!     .with_reason("EPERM");
//!
//! assert_eq!(ev.kind.state(), Some(ProbeState::Failed));
//! assert_eq!(ev.probe.as_deref(), Some("fileopen"));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static LIFECYCLE_SEQ: AtomicU64 = AtomicU64::new(0);

/// State of one probe instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeState {
    /// A factory exists under the probe's name.
    Registered,
    /// `Load` succeeded.
    Loaded,
    /// The run task was launched.
    Running,
    /// Cancellation was signalled; `Close` follows.
    Stopping,
    /// `Close` succeeded.
    Closed,
    /// Terminal failure (load, run, close or panic).
    Failed,
}

impl ProbeState {
    /// Short lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeState::Registered => "registered",
            ProbeState::Loaded => "loaded",
            ProbeState::Running => "running",
            ProbeState::Stopping => "stopping",
            ProbeState::Closed => "closed",
            ProbeState::Failed => "failed",
        }
    }

    /// True for `Closed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProbeState::Closed | ProbeState::Failed)
    }
}

impl fmt::Display for ProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    // === Probe transitions ===
    /// Factory registered (or replaced).
    ///
    /// Sets:
    /// - `probe`: probe name
    /// - `reason`: `"replaced"` when an earlier factory was overwritten
    ProbeRegistered,

    /// `Load` succeeded.
    ProbeLoaded,

    /// Run task launched and recorded in the active table.
    ProbeRunning,

    /// Cancellation signalled as part of a stop.
    ProbeStopping,

    /// `Close` succeeded and the entry is gone from the active table.
    ProbeClosed,

    /// Probe entered the terminal `Failed` state.
    ///
    /// Sets:
    /// - `probe`: probe name
    /// - `label`: error label (see [`ProbeError::as_label`](crate::ProbeError::as_label))
    /// - `reason`: error message
    ProbeFailed,

    // === Operational notices ===
    /// An error was reported on the error channel.
    ///
    /// Sets:
    /// - `probe`: probe name, if the error concerns one
    /// - `label`: error label
    /// - `reason`: error message
    ErrorReported,

    /// An error was dropped because the error channel was full or closed.
    ErrorDropped,

    /// `shutdown()` began.
    ShutdownStarted,

    /// `shutdown()` finished; the active table is empty.
    ShutdownFinished,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `probe`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber queue rejected an event.
    ///
    /// Sets:
    /// - `probe`: subscriber name
    /// - `reason`: `"full"` or `"closed"`
    SubscriberOverflow,
}

impl LifecycleKind {
    /// Probe state this event moves the probe into, if it is a transition.
    pub fn state(&self) -> Option<ProbeState> {
        match self {
            LifecycleKind::ProbeRegistered => Some(ProbeState::Registered),
            LifecycleKind::ProbeLoaded => Some(ProbeState::Loaded),
            LifecycleKind::ProbeRunning => Some(ProbeState::Running),
            LifecycleKind::ProbeStopping => Some(ProbeState::Stopping),
            LifecycleKind::ProbeClosed => Some(ProbeState::Closed),
            LifecycleKind::ProbeFailed => Some(ProbeState::Failed),
            _ => None,
        }
    }
}

/// Lifecycle event with optional metadata.
#[derive(Clone, Debug)]
pub struct LifecycleEvent {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: LifecycleKind,
    /// Probe (or subscriber) name, if applicable.
    pub probe: Option<Arc<str>>,
    /// Stable error label for failure notices.
    pub label: Option<&'static str>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

impl LifecycleEvent {
    /// Creates an event with the current timestamp and next sequence number.
    pub fn new(kind: LifecycleKind) -> Self {
        Self {
            seq: LIFECYCLE_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            probe: None,
            label: None,
            reason: None,
        }
    }

    /// Shorthand for a probe transition event.
    #[inline]
    pub fn transition(kind: LifecycleKind, probe: impl Into<Arc<str>>) -> Self {
        Self::new(kind).with_probe(probe)
    }

    /// Attaches a probe name.
    #[inline]
    pub fn with_probe(mut self, probe: impl Into<Arc<str>>) -> Self {
        self.probe = Some(probe.into());
        self
    }

    /// Attaches an error label.
    #[inline]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Self::new(LifecycleKind::SubscriberOverflow)
            .with_probe(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Self::new(LifecycleKind::SubscriberPanicked)
            .with_probe(subscriber)
            .with_reason(info)
    }
}
