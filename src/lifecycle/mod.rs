//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the lifecycle **data model** and the **bus** used to
//! publish/subscribe to transitions and operational errors emitted by the
//! probe manager and the per-probe run tasks.
//!
//! ## Contents
//! - [`ProbeState`] the per-instance state machine
//! - [`LifecycleKind`], [`LifecycleEvent`] event classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `ProbeManager` (register/start/stop/shutdown), run tasks
//!   (failures, panics), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener spawned by the builder, and anyone
//!   holding a receiver from [`ProbeManager::subscribe`](crate::ProbeManager::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{LifecycleEvent, LifecycleKind, ProbeState};
