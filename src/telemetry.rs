//! # Telemetry events produced by probes.
//!
//! [`TelemetryEvent`] is the unit of output carried from any probe to the consumer of
//! the manager's event channel. The payload is free-form text.

use serde::{Deserialize, Serialize};

/// One unit of probe output.
///
/// `timestamp` is unix seconds; `0` means unset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Name of the probe that produced the event.
    pub probe_name: String,
    /// Unix timestamp in seconds (`0` = unset).
    #[serde(default)]
    pub timestamp: i64,
    /// Opaque payload.
    pub data: String,
}

impl TelemetryEvent {
    /// Creates an event without a timestamp.
    pub fn new(probe_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            probe_name: probe_name.into(),
            timestamp: 0,
            data: data.into(),
        }
    }

    /// Creates an event stamped with the current wall-clock time.
    pub fn now(probe_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self::new(probe_name, data).with_timestamp(chrono::Utc::now().timestamp())
    }

    /// Sets the timestamp.
    #[inline]
    pub fn with_timestamp(mut self, unix_secs: i64) -> Self {
        self.timestamp = unix_secs;
        self
    }

    /// True if the timestamp was set.
    #[inline]
    pub fn has_timestamp(&self) -> bool {
        self.timestamp != 0
    }
}
