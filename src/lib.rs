//! # probevisor
//!
//! **Probevisor** runs a variable set of pluggable telemetry producers ("probes")
//! and merges their output into one event stream.
//!
//! The interesting part is not any single probe but the [`ProbeManager`]: given a
//! desired `name → on/off` configuration it starts, stops and supervises probes,
//! contains their panics, and tears everything down on shutdown.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ ProbeFactory │   │ ProbeFactory │   │ ProbeFactory │
//!     │ ("heartbeat")│   │  ("echo")    │   │    (...)     │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ProbeManager (reconciler)                                        │
//! │  - ProbeRegistry (name → factory)                                 │
//! │  - active table  (name → instance + child CancellationToken)      │
//! │  - one Mutex around both                                          │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │  run task    │   │  run task    │   │  run task    │   │ Registered
//!     │ (catch_unwind│   │ (catch_unwind│   │ (catch_unwind│   │ Loaded
//!     │  boundary)   │   │  boundary)   │   │  boundary)   │   │ Stopping
//!     └┬──────┬──────┘   └┬──────┬──────┘   └┬──────┬──────┘   │ Closed ...
//!      │      │           │      │           │      │          │
//!      │      └───────────┼──────┴───────────┼──────┴─► errors (mpsc, bounded)
//!      ▼                  ▼                  ▼                 ▼
//!   events (mpsc, bounded, backpressure)        ┌───────────────────────┐
//!                                               │ Bus (broadcast)       │
//!                                               └──────────┬────────────┘
//!                                                          ▼
//!                                               subscriber listener
//!                                                          ▼
//!                                               SubscriberSet ─► LogWriter, ...
//! ```
//!
//! ### Lifecycle
//! ```text
//! Registered ──► Loaded ──► Running ──► Stopping ──► Closed
//!      │            │           │                       │
//!      └────────────┴───────────┴──────► Failed ◄───────┘
//!   (factory panic)  (load error)  (run error/panic)  (close error)
//! ```
//!
//! ## Features
//! | Area              | Description                                                | Key types / traits                          |
//! |-------------------|------------------------------------------------------------|---------------------------------------------|
//! | **Probes**        | Contract every telemetry producer implements.              | [`Probe`], [`ProbeFn`], [`HeartbeatProbe`]  |
//! | **Reconciliation**| Diff desired state against running probes.                 | [`ProbeManager`], [`ProbeRegistry`]         |
//! | **Errors**        | Typed, machine-distinguishable failure categories.         | [`ProbeError`], [`VerifierError`]           |
//! | **Lifecycle**     | Observe transitions and operational notices.               | [`LifecycleEvent`], [`Subscribe`]           |
//! | **Configuration** | Channel sizes, stop grace, run-error policy.               | [`Config`], [`RunErrorPolicy`]              |
//! | **Agent**         | Signal-driven process runner.                              | [`agent::run`]                              |
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use probevisor::{BoxError, Config, Emitter, ProbeFn, ProbeManager, ProbeRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let (mgr, mut channels) = ProbeManager::builder(Config::default())
//!         .register("echo", || {
//!             ProbeFn::arc("echo", |ctx: CancellationToken, out: Emitter| async move {
//!                 out.emit_data("x").await?;
//!                 ctx.cancelled().await;
//!                 Ok::<_, BoxError>(())
//!             }) as ProbeRef
//!         })
//!         .build();
//!
//!     mgr.reconcile([("echo", true)]).await;
//!     let ev = channels.events.recv().await.unwrap();
//!     assert_eq!((ev.probe_name.as_str(), ev.data.as_str()), ("echo", "x"));
//!
//!     mgr.reconcile([("echo", false)]).await;
//!     assert!(!mgr.is_active("echo").await);
//! }
//! ```

pub mod agent;
mod config;
mod core;
mod error;
mod lifecycle;
mod probes;
mod subscribers;
mod telemetry;

// ---- Public re-exports ----

pub use config::{Config, RunErrorPolicy};
pub use crate::core::{
    ManagerChannels, ProbeManager, ProbeManagerBuilder, ProbeRegistry, wait_for_shutdown_signal,
};
pub use error::{BoxError, EmitError, ProbeError, VerifierError};
pub use lifecycle::{Bus, LifecycleEvent, LifecycleKind, ProbeState};
pub use probes::{Emitter, HeartbeatProbe, Probe, ProbeFactory, ProbeFn, ProbeRef};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use telemetry::TelemetryEvent;
