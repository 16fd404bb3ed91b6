//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the probe manager.
//!
//! ## Sentinel values
//! - `event_capacity = 0` / `error_capacity = 0` / `bus_capacity = 0` → clamped to 1
//! - `stop_grace = 0s` → stop does not wait for the run task (signal and proceed)
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use probevisor::{Config, RunErrorPolicy};
//!
//! let mut cfg = Config::default();
//! cfg.stop_grace = Duration::from_millis(500);
//! cfg.run_errors = RunErrorPolicy::Classify;
//!
//! assert_eq!(cfg.event_capacity, 100);
//! assert_eq!(cfg.stop_wait(), Some(Duration::from_millis(500)));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a non-nil `Run` result is reported on the error channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunErrorPolicy {
    /// Every `Run` error is reported as
    /// [`ProbeError::ContextCanceled`](crate::ProbeError::ContextCanceled).
    #[default]
    AsCanceled,
    /// `ContextCanceled` only when the probe's token was cancelled;
    /// [`ProbeError::RunFailed`](crate::ProbeError::RunFailed) otherwise.
    Classify,
}

/// Global configuration for the probe manager.
///
/// ## Field semantics
/// - `event_capacity`: Telemetry channel capacity (min 1)
/// - `error_capacity`: Error channel capacity (min 1)
/// - `bus_capacity`: Lifecycle bus ring buffer size (min 1)
/// - `stop_grace`: How long stop waits for the run task before `Close` (`0s` = don't wait)
/// - `run_errors`: Reporting policy for `Run` errors
/// - `heartbeat_interval`: Tick period of the built-in heartbeat probe
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capacity of the shared telemetry event channel.
    ///
    /// Probes block in [`Emitter::emit`](crate::Emitter::emit) while it is full.
    pub event_capacity: usize,

    /// Capacity of the shared error channel.
    ///
    /// Errors that find it full are dropped (and logged).
    pub error_capacity: usize,

    /// Capacity of the lifecycle event bus.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages skip older items.
    pub bus_capacity: usize,

    /// Maximum time a stop waits for the probe's run task to exit.
    ///
    /// - `Duration::ZERO` = cancel and proceed to `Close` immediately
    /// - `> 0` = wait up to this long; on timeout report `StopFailed` and close anyway
    pub stop_grace: Duration,

    /// Reporting policy for errors returned by `Run`.
    pub run_errors: RunErrorPolicy,

    /// Interval between heartbeat events.
    pub heartbeat_interval: Duration,
}

impl Config {
    /// Event channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn event_capacity_clamped(&self) -> usize {
        self.event_capacity.max(1)
    }

    /// Error channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn error_capacity_clamped(&self) -> usize {
        self.error_capacity.max(1)
    }

    /// Lifecycle bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the stop wait as an `Option`.
    ///
    /// - `None` → non-blocking stop
    /// - `Some(d)` → wait up to `d` for the run task
    #[inline]
    pub fn stop_wait(&self) -> Option<Duration> {
        if self.stop_grace == Duration::ZERO {
            None
        } else {
            Some(self.stop_grace)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `event_capacity = 100`, `error_capacity = 100`
    /// - `bus_capacity = 1024`
    /// - `stop_grace = 0s` (non-blocking stop)
    /// - `run_errors = RunErrorPolicy::AsCanceled`
    /// - `heartbeat_interval = 10s`
    fn default() -> Self {
        Self {
            event_capacity: 100,
            error_capacity: 100,
            bus_capacity: 1024,
            stop_grace: Duration::ZERO,
            run_errors: RunErrorPolicy::default(),
            heartbeat_interval: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacities_are_clamped() {
        let cfg = Config {
            event_capacity: 0,
            error_capacity: 0,
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.event_capacity_clamped(), 1);
        assert_eq!(cfg.error_capacity_clamped(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn zero_grace_means_no_wait() {
        assert_eq!(Config::default().stop_wait(), None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{"event_capacity": 8, "run_errors": "classify"}"#).unwrap();
        assert_eq!(cfg.event_capacity, 8);
        assert_eq!(cfg.error_capacity, 100);
        assert_eq!(cfg.run_errors, RunErrorPolicy::Classify);
    }
}
