//! # Lifecycle subscribers.
//!
//! This module provides the [`Subscribe`] trait, the fan-out [`SubscriberSet`] and the
//! built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! ProbeManager / run tasks ── publish ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                                │
//!                                               ┌────────────────┼────────────────┐
//!                                               ▼                ▼                ▼
//!                                          [queue S1]       [queue S2]       [queue SN]
//!                                               ▼                ▼                ▼
//!                                         LogWriter       custom sub ...   custom sub
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub(crate) use set::panic_message;
pub use subscriber::Subscribe;
