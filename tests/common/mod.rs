#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use probevisor::{BoxError, Emitter, Probe, ProbeError, ProbeRef, VerifierError};

pub const WITHIN: Duration = Duration::from_secs(2);

/// Call counts shared between a mock factory and the test.
#[derive(Default, Debug)]
pub struct Counters {
    pub built: AtomicUsize,
    pub loaded: AtomicUsize,
    pub ran: AtomicUsize,
    pub closed: AtomicUsize,
}

impl Counters {
    pub fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }
    pub fn loaded(&self) -> usize {
        self.loaded.load(Ordering::SeqCst)
    }
    pub fn ran(&self) -> usize {
        self.ran.load(Ordering::SeqCst)
    }
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug)]
pub enum RunMode {
    /// Wait for cancellation, return Ok.
    Idle,
    /// Emit one event, then idle.
    Echo(&'static str),
    /// Panic immediately.
    Panic,
    /// Return an error immediately.
    Fail,
    /// Wait for cancellation, then return an error.
    FailOnCancel,
}

#[derive(Clone, Copy, Debug)]
pub enum LoadMode {
    Ok,
    Io,
    Verifier,
}

#[derive(Clone, Debug)]
pub struct Mock {
    pub name: &'static str,
    pub run: RunMode,
    pub load: LoadMode,
    pub close_fails: bool,
    pub counters: Arc<Counters>,
}

impl Mock {
    pub fn new(name: &'static str, run: RunMode) -> Self {
        Self {
            name,
            run,
            load: LoadMode::Ok,
            close_fails: false,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn load(mut self, load: LoadMode) -> Self {
        self.load = load;
        self
    }

    pub fn close_fails(mut self) -> Self {
        self.close_fails = true;
        self
    }

    /// Factory that counts constructions.
    pub fn factory(&self) -> impl Fn() -> ProbeRef + Send + Sync + 'static {
        let template = self.clone();
        move || {
            template.counters.built.fetch_add(1, Ordering::SeqCst);
            Arc::new(template.clone()) as ProbeRef
        }
    }
}

#[async_trait]
impl Probe for Mock {
    fn name(&self) -> &str {
        self.name
    }

    async fn load(&self) -> Result<(), BoxError> {
        self.counters.loaded.fetch_add(1, Ordering::SeqCst);
        match self.load {
            LoadMode::Ok => Ok(()),
            LoadMode::Io => Err(std::io::Error::other("EPERM").into()),
            LoadMode::Verifier => Err(VerifierError::new("invalid mem access 'scalar'")
                .with_log(["0: r1 = *(u64 *)(r0 + 8)"])
                .into()),
        }
    }

    async fn run(&self, ctx: CancellationToken, out: Emitter) -> Result<(), BoxError> {
        self.counters.ran.fetch_add(1, Ordering::SeqCst);
        match self.run {
            RunMode::Idle => {
                ctx.cancelled().await;
                Ok(())
            }
            RunMode::Echo(data) => {
                out.emit_data(data).await?;
                ctx.cancelled().await;
                Ok(())
            }
            RunMode::Panic => panic!("probe {} exploded", self.name),
            RunMode::Fail => Err("ring buffer read failed".into()),
            RunMode::FailOnCancel => {
                ctx.cancelled().await;
                Err("interrupted".into())
            }
        }
    }

    async fn close(&self) -> Result<(), BoxError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        if self.close_fails {
            Err("detach failed".into())
        } else {
            Ok(())
        }
    }
}

/// Receives the next item or panics after [`WITHIN`].
pub async fn recv<T>(rx: &mut mpsc::Receiver<T>) -> T {
    tokio::time::timeout(WITHIN, rx.recv())
        .await
        .expect("timed out waiting on channel")
        .expect("channel closed")
}

/// Asserts nothing further arrives for a short while.
pub async fn assert_quiet(rx: &mut mpsc::Receiver<ProbeError>) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    if let Ok(extra) = rx.try_recv() {
        panic!("unexpected error: {extra:?}");
    }
}

/// Polls `cond` until it holds or [`WITHIN`] passes.
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WITHIN;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
