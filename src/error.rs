//! Error types used by the probevisor runtime and probes.
//!
//! This module defines:
//!
//! - [`ProbeError`] - every failure category the probe manager can report.
//! - [`VerifierError`] - a load-time validation failure a probe may return so
//!   that it is surfaced as [`ProbeError::LoadRejected`] instead of a generic load failure.
//! - [`EmitError`] - why an [`Emitter`](crate::Emitter) refused an event.
//!
//! [`ProbeError`] provides helper methods (`as_label`, `probe_name`, `is_expected`)
//! so callers can branch on the failure kind without parsing messages.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Boxed cause carried by probe operations.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// # Errors produced by the probe manager.
///
/// Every error reaches the consumer through the manager's bounded error channel;
/// none are returned synchronously from [`ProbeManager::reconcile`](crate::ProbeManager::reconcile).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Desired state names a probe that has no registered factory.
    #[error("probe {name} not found")]
    NotFound {
        /// Requested probe name.
        name: String,
    },

    /// Desired configuration is malformed.
    #[error("config invalid: {source}")]
    ConfigInvalid {
        /// What was wrong with it.
        #[source]
        source: BoxError,
    },

    /// `Load` failed; the probe was not started.
    #[error("probe {name} load failed: {source}")]
    LoadFailed {
        /// Probe name.
        name: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// `Load` failed because the probe's instrumentation did not pass validation.
    #[error("probe {name} load failed (verifier error): {source}")]
    LoadRejected {
        /// Probe name.
        name: String,
        /// Verifier output.
        #[source]
        source: VerifierError,
    },

    /// `Run` returned an error while the probe was not being cancelled.
    #[error("probe {name} run failed: {source}")]
    RunFailed {
        /// Probe name.
        name: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// Start was attempted but could not proceed.
    #[error("failed to start probe {name}: {source}")]
    StartFailed {
        /// Probe name.
        name: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// Stop could not confirm that the run task exited.
    #[error("failed to stop probe {name}: {source}")]
    StopFailed {
        /// Probe name.
        name: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// `Close` returned an error; bookkeeping was cleared anyway.
    #[error("failed to close probe {name}: {source}")]
    CloseFailed {
        /// Probe name.
        name: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// The probe's run task panicked.
    #[error("probe {name} panicked: {info}")]
    Panicked {
        /// Probe name.
        name: String,
        /// Recovered panic payload, rendered as text.
        info: String,
    },

    /// The probe's run ended with an error after (or reported as) cancellation.
    #[error("probe {name} context canceled")]
    ContextCanceled {
        /// Probe name.
        name: String,
    },
}

impl ProbeError {
    /// Builds [`ProbeError::NotFound`].
    pub fn not_found(name: impl Into<String>) -> Self {
        ProbeError::NotFound { name: name.into() }
    }

    /// Builds [`ProbeError::ConfigInvalid`].
    pub fn config_invalid(source: impl Into<BoxError>) -> Self {
        ProbeError::ConfigInvalid {
            source: source.into(),
        }
    }

    /// Builds a load failure.
    ///
    /// If `source` is a [`VerifierError`] the result is [`ProbeError::LoadRejected`],
    /// otherwise [`ProbeError::LoadFailed`].
    ///
    /// # Example
    /// ```
    /// use probevisor::{ProbeError, VerifierError};
    ///
    /// let err = ProbeError::load_failed("fileopen", VerifierError::new("invalid mem access"));
    /// assert_eq!(err.as_label(), "probe_load_rejected");
    ///
    /// let err = ProbeError::load_failed("fileopen", std::io::Error::other("EPERM"));
    /// assert_eq!(err.as_label(), "probe_load_failed");
    /// ```
    pub fn load_failed(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        let name = name.into();
        match source.into().downcast::<VerifierError>() {
            Ok(verifier) => ProbeError::LoadRejected {
                name,
                source: *verifier,
            },
            Err(source) => ProbeError::LoadFailed { name, source },
        }
    }

    /// Builds [`ProbeError::RunFailed`].
    pub fn run_failed(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ProbeError::RunFailed {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Builds [`ProbeError::StartFailed`].
    pub fn start_failed(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ProbeError::StartFailed {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Builds [`ProbeError::StopFailed`].
    pub fn stop_failed(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ProbeError::StopFailed {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Builds [`ProbeError::CloseFailed`].
    pub fn close_failed(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ProbeError::CloseFailed {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Builds [`ProbeError::Panicked`].
    pub fn panicked(name: impl Into<String>, info: impl Into<String>) -> Self {
        ProbeError::Panicked {
            name: name.into(),
            info: info.into(),
        }
    }

    /// Builds [`ProbeError::ContextCanceled`].
    pub fn context_canceled(name: impl Into<String>) -> Self {
        ProbeError::ContextCanceled { name: name.into() }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use probevisor::ProbeError;
    ///
    /// assert_eq!(ProbeError::not_found("x").as_label(), "probe_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProbeError::NotFound { .. } => "probe_not_found",
            ProbeError::ConfigInvalid { .. } => "config_invalid",
            ProbeError::LoadFailed { .. } => "probe_load_failed",
            ProbeError::LoadRejected { .. } => "probe_load_rejected",
            ProbeError::RunFailed { .. } => "probe_run_failed",
            ProbeError::StartFailed { .. } => "probe_start_failed",
            ProbeError::StopFailed { .. } => "probe_stop_failed",
            ProbeError::CloseFailed { .. } => "probe_close_failed",
            ProbeError::Panicked { .. } => "probe_panicked",
            ProbeError::ContextCanceled { .. } => "probe_context_canceled",
        }
    }

    /// Returns the probe this error concerns, if any.
    pub fn probe_name(&self) -> Option<&str> {
        match self {
            ProbeError::ConfigInvalid { .. } => None,
            ProbeError::NotFound { name }
            | ProbeError::LoadFailed { name, .. }
            | ProbeError::LoadRejected { name, .. }
            | ProbeError::RunFailed { name, .. }
            | ProbeError::StartFailed { name, .. }
            | ProbeError::StopFailed { name, .. }
            | ProbeError::CloseFailed { name, .. }
            | ProbeError::Panicked { name, .. }
            | ProbeError::ContextCanceled { name } => Some(name.as_str()),
        }
    }

    /// True for load failures of either kind.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            ProbeError::LoadFailed { .. } | ProbeError::LoadRejected { .. }
        )
    }

    /// True when the error describes an expected termination rather than a fault.
    ///
    /// Only [`ProbeError::ContextCanceled`] qualifies.
    pub fn is_expected(&self) -> bool {
        matches!(self, ProbeError::ContextCanceled { .. })
    }
}

/// Load-time validation failure of a probe's instrumentation artifact.
///
/// Probes return this (boxed) from [`Probe::load`](crate::Probe::load) when the kernel
/// verifier, or an equivalent checker, refuses the program. The manager reports it as
/// [`ProbeError::LoadRejected`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierError {
    message: String,
    log: Vec<String>,
}

impl VerifierError {
    /// Creates a verifier error with a summary message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            log: Vec::new(),
        }
    }

    /// Attaches the verifier log lines.
    pub fn with_log<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.log = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Summary message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Verifier log, oldest line first.
    pub fn log(&self) -> &[String] {
        &self.log
    }
}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.log.last() {
            Some(last) => write!(f, "{}: {}", self.message, last),
            None => f.write_str(&self.message),
        }
    }
}

impl StdError for VerifierError {}

/// Why an event could not be emitted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitError {
    /// The probe's cancellation fired while waiting for channel capacity.
    #[error("emit canceled")]
    Canceled,
    /// The event consumer is gone.
    #[error("event channel closed")]
    Closed,
}
