//! # Probe abstractions and built-in probes.
//!
//! This module provides the probe-related types:
//! - [`Probe`] - trait every telemetry producer implements
//! - [`ProbeRef`] / [`ProbeFactory`] - shared instance and constructor handles
//! - [`Emitter`] - output sink handed to [`Probe::run`]
//! - [`ProbeFn`] - closure-backed probe implementation
//! - [`HeartbeatProbe`] - periodic liveness probe

mod heartbeat;
mod probe;
mod probe_fn;

pub use heartbeat::HeartbeatProbe;
pub use probe::{Emitter, Probe, ProbeFactory, ProbeRef};
pub use probe_fn::ProbeFn;
