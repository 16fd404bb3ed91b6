//! Runtime core: registry, reconciliation and supervision.
//!
//! The public API from this module is [`ProbeManager`] (with its builder) and
//! [`ProbeRegistry`].
//!
//! Internal modules:
//! - [`manager`]: reconcile/stop/shutdown under one lock;
//! - [`runner`]: launches `Probe::run` behind a panic boundary;
//! - [`table`]: active-probe bookkeeping;
//! - [`report`]: non-blocking writes to the error channel;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod manager;
mod registry;
mod report;
mod runner;
mod shutdown;
mod table;

pub use builder::{ManagerChannels, ProbeManagerBuilder};
pub use manager::ProbeManager;
pub use registry::ProbeRegistry;
pub use shutdown::wait_for_shutdown_signal;
