
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::debug;

use crate::{RagError, Result};

/// Where a successful initialization got its documents from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPath {
    /// Restored from the on-disk snapshot
    Snapshot,
    /// Downloaded, extracted and embedded from the source archive
    Archive,
}

impl fmt::Display for StartPath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot => write!(f, "snapshot"),
            Self::Archive => write!(f, "archive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitState {
    NotStarted,
    Running,
    Succeeded(StartPath),
    Failed(RagError),
}

impl InitState {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

type PendingInit = Shared<BoxFuture<'static, Result<StartPath>>>;

enum Slot {
    Idle,
    Running(PendingInit),
    Done(Result<StartPath>),
}

/// Runs an initialization routine at most once and hands its outcome to every caller.
///
/// The routine runs on its own task, so it finishes and records its outcome
/// even when every caller waiting on it is dropped. Callers arriving while it
/// is in flight await the same run. A failure is recorded like a success and
/// is never retried.
pub struct InitGate {
    slot: Arc<Mutex<Slot>>,
}

impl fmt::Debug for InitGate {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitGate")
            .field("state", &self.state())
            .finish()
    }
}

impl Default for InitGate {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl InitGate {
    #[inline]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Idle)),
        }
    }

    /// Start `init` on the first call; every call returns the outcome of that one run.
    ///
    /// Must be called from within a tokio runtime.
    #[inline]
    pub async fn run<F, Fut>(&self, init: F) -> Result<StartPath>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<StartPath>> + Send + 'static,
    {
        let pending = {
            let mut slot = self.slot.lock();
            match &*slot {
                Slot::Done(outcome) => return outcome.clone(),
                Slot::Running(pending) => pending.clone(),
                Slot::Idle => {
                    debug!("Starting initialization");
                    let pending = self.spawn(init());
                    *slot = Slot::Running(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    fn spawn<Fut>(&self, init: Fut) -> PendingInit
    where
        Fut: Future<Output = Result<StartPath>> + Send + 'static,
    {
        let recorder = Arc::clone(&self.slot);
        let handle = tokio::spawn(async move {
            let outcome = init.await;
            *recorder.lock() = Slot::Done(outcome.clone());
            outcome
        });

        let slot = Arc::clone(&self.slot);
        async move {
            handle.await.unwrap_or_else(|e| {
                let error = RagError::Io(format!("Initialization task failed: {}", e));
                *slot.lock() = Slot::Done(Err(error.clone()));
                Err(error)
            })
        }
        .boxed()
        .shared()
    }

    #[inline]
    pub fn state(&self) -> InitState {
        let slot = self.slot.lock();
        match &*slot {
            Slot::Idle => InitState::NotStarted,
            Slot::Running(_) => InitState::Running,
            Slot::Done(Ok(path)) => InitState::Succeeded(*path),
            Slot::Done(Err(error)) => InitState::Failed(error.clone()),
        }
    }

    #[inline]
    pub fn outcome(&self) -> Option<Result<StartPath>> {
        let slot = self.slot.lock();
        match &*slot {
            Slot::Done(outcome) => Some(outcome.clone()),
            Slot::Idle | Slot::Running(_) => None,
        }
    }
}
