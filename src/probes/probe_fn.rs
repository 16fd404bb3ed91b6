//! # Function-backed probe (`ProbeFn`)
//!
//! [`ProbeFn`] wraps a closure `F: Fn(CancellationToken, Emitter) -> Fut` as the probe's
//! `run` body, with optional synchronous `load`/`close` hooks. Each `run` call creates
//! a fresh future; shared state must be captured explicitly (e.g. `Arc<...>`).
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use probevisor::{BoxError, Emitter, ProbeFn, ProbeRef};
//!
//! let p: ProbeRef = ProbeFn::arc("echo", |ctx: CancellationToken, out: Emitter| async move {
//!     let _ = out.emit_data("x").await;
//!     ctx.cancelled().await;
//!     Ok::<_, BoxError>(())
//! });
//! assert_eq!(p.name(), "echo");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BoxError;
use crate::probes::probe::{Emitter, Probe};

type Hook = Box<dyn Fn() -> Result<(), BoxError> + Send + Sync>;

/// Closure-backed probe implementation.
pub struct ProbeFn<F> {
    name: Cow<'static, str>,
    f: F,
    on_load: Option<Hook>,
    on_close: Option<Hook>,
}

impl<F> ProbeFn<F> {
    /// Creates a new function-backed probe with no-op load/close.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            on_load: None,
            on_close: None,
        }
    }

    /// Creates the probe and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }

    /// Sets the `load` hook.
    pub fn on_load<H>(mut self, hook: H) -> Self
    where
        H: Fn() -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_load = Some(Box::new(hook));
        self
    }

    /// Sets the `close` hook.
    pub fn on_close<H>(mut self, hook: H) -> Self
    where
        H: Fn() -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_close = Some(Box::new(hook));
        self
    }
}

impl<F> fmt::Debug for ProbeFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeFn")
            .field("name", &self.name)
            .field("on_load", &self.on_load.is_some())
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}

#[async_trait]
impl<F, Fut> Probe for ProbeFn<F>
where
    F: Fn(CancellationToken, Emitter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<(), BoxError> {
        match &self.on_load {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }

    async fn run(&self, ctx: CancellationToken, out: Emitter) -> Result<(), BoxError> {
        (self.f)(ctx, out).await
    }

    async fn close(&self) -> Result<(), BoxError> {
        match &self.on_close {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }
}
