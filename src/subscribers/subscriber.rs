//! # Lifecycle subscriber trait.
//!
//! Each subscriber gets a dedicated worker task and a bounded queue
//! (capacity via [`Subscribe::queue_capacity`]). Panics are caught and published as
//! [`LifecycleKind::SubscriberPanicked`](crate::LifecycleKind::SubscriberPanicked).
//!
//! ## Overflow behavior
//! 1) The new event is **dropped** for this subscriber only.
//! 2) A `SubscriberOverflow` event is published.
//! 3) Other subscribers are unaffected.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use probevisor::{LifecycleEvent, LifecycleKind, Subscribe};
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, ev: &LifecycleEvent) {
//!         if matches!(ev.kind, LifecycleKind::ProbeFailed) {
//!             // bump a counter, page someone, ...
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::lifecycle::LifecycleEvent;

/// Observer of lifecycle events.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally.
/// - Slow processing affects only this subscriber's queue.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event. Called from the subscriber's worker, FIFO.
    async fn on_event(&self, event: &LifecycleEvent);

    /// Name used in overflow/panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
