//! Resumption targets for asynchronous continuations.
//!
//! A continuation registered with no execution context runs inline on whichever
//! thread completes the awaited operation. When the host captured a context at
//! call time, the continuation is posted to it instead, which preserves whatever
//! thread affinity that context guarantees.

use crossbeam::channel::{self, Receiver, SendError, Sender};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::warn;

/// A unit of deferred work posted to an execution context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// An explicitly captured resumption context.
pub trait ExecutionContext: Send + Sync + fmt::Debug {
    /// Schedule `job` to run on this context.
    fn post(&self, job: Job);

    fn name(&self) -> &str {
        "execution-context"
    }
}

/// Resumes continuations as tasks on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutionContext {
    handle: Handle,
}

impl TokioExecutionContext {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Capture the runtime of the calling thread, if it is inside one.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

/// Holds a posted job until the task runs it. If tokio drops the task without
/// polling it, as it does once the runtime has shut down, the job runs inline
/// from the drop instead.
struct PostedJob(Option<Job>);

impl PostedJob {
    fn run(mut self) {
        if let Some(job) = self.0.take() {
            job();
        }
    }
}

impl Drop for PostedJob {
    fn drop(&mut self) {
        if let Some(job) = self.0.take() {
            warn!("Tokio runtime dropped a posted continuation, running it inline");
            job();
        }
    }
}

impl ExecutionContext for TokioExecutionContext {
    fn post(&self, job: Job) {
        let posted = PostedJob(Some(job));
        self.handle.spawn(async move { posted.run() });
    }

    fn name(&self) -> &str {
        "tokio"
    }
}

/// A single-consumer work queue owned by one thread, such as an event loop.
///
/// Jobs posted from any thread are executed only when the owner drains the
/// queue through its [`QueueDrain`].
#[derive(Debug)]
pub struct QueueExecutionContext {
    name: String,
    sender: Sender<Job>,
}

impl QueueExecutionContext {
    pub fn new(name: impl Into<String>) -> (Arc<Self>, QueueDrain) {
        let (sender, receiver) = channel::unbounded();
        (
            Arc::new(Self {
                name: name.into(),
                sender,
            }),
            QueueDrain { receiver },
        )
    }
}

impl ExecutionContext for QueueExecutionContext {
    fn post(&self, job: Job) {
        // Owner is gone: running inline is the only way the job still happens
        if let Err(SendError(job)) = self.sender.send(job) {
            warn!(
                context = %self.name,
                "Execution context queue closed, running continuation inline"
            );
            job();
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// The consuming end of a [`QueueExecutionContext`].
pub struct QueueDrain {
    receiver: Receiver<Job>,
}

impl QueueDrain {
    /// Run every job currently queued. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Block until `count` jobs have run or `timeout` elapses. Returns how many ran.
    ///
    /// A timeout too large to express as a deadline waits without one.
    pub fn run_until(&self, count: usize, timeout: Duration) -> usize {
        let deadline = Instant::now().checked_add(timeout);
        let mut ran = 0;
        while ran < count {
            let received = match deadline {
                Some(deadline) => self
                    .receiver
                    .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                    .ok(),
                None => self.receiver.recv().ok(),
            };
            match received {
                Some(job) => {
                    job();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
