//! FIFO queue of async tasks executed one at a time
//!
//! [`AwaitQueue::push`] enqueues synchronously and hands back a future of the
//! task's result. A single executor task owns execution: it reads wake-ups
//! from an mpsc mailbox and runs queued tasks strictly in order, each one only
//! after the previous settled. The executor exits once every queue handle is
//! dropped and the mailbox drains.
//!
//! [`AwaitQueue::stop`] rejects every task still in the queue, the running one
//! included, with [`QueueError::Stopped`]. The running task is cancelled at its
//! next suspension point; side effects it already applied are not rolled back.
//!
//! A task that panics is rejected with [`QueueError::Panicked`] and the
//! executor moves on to the next one.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::{QueueError, TaskSnapshot};
use crate::config::QueueSection;

type TaskRunner = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;
type TaskRejecter = Box<dyn FnOnce(QueueError) + Send>;

struct PendingTask {
    id: u64,
    name: String,
    enqueued_at: Instant,
    executed_at: Option<Instant>,
    run: Option<TaskRunner>,
    reject: TaskRejecter,
}

/// Queue options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueOptions {
    /// Name used in logs
    pub name: String,
    /// Log tasks running longer than this at `warn`
    pub warn_after: Option<Duration>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        QueueSection::default().into()
    }
}

impl From<QueueSection> for QueueOptions {
    fn from(section: QueueSection) -> Self {
        Self {
            warn_after: section.warn_after(),
            name: section.name,
        }
    }
}

impl QueueOptions {
    /// Options with a name and no slow task warning
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            warn_after: None,
        }
    }
}

struct QueueState {
    tasks: VecDeque<PendingTask>,
    cancel: CancellationToken,
}

struct Shared {
    options: QueueOptions,
    next_id: AtomicU64,
    state: Mutex<QueueState>,
}

impl Shared {
    fn start_next(&self) -> Option<(u64, String, TaskRunner, CancellationToken)> {
        let mut state = self.state.lock();
        let cancel = state.cancel.clone();
        let task = state.tasks.front_mut()?;
        let run = task.run.take()?;
        task.executed_at = Some(Instant::now());
        Some((task.id, task.name.clone(), run, cancel))
    }

    fn finish(&self, id: u64) {
        let mut state = self.state.lock();
        if state.tasks.front().map(|task| task.id) == Some(id) {
            state.tasks.pop_front();
        }
    }

    fn take(&self, id: u64) -> Option<PendingTask> {
        let mut state = self.state.lock();
        let index = state.tasks.iter().position(|task| task.id == id)?;
        state.tasks.remove(index)
    }
}

async fn run_executor(shared: Arc<Shared>, mut mailbox: mpsc::UnboundedReceiver<()>) {
    while mailbox.recv().await.is_some() {
        while let Some((id, name, run, cancel)) = shared.start_next() {
            let started = Instant::now();

            tokio::select! {
                outcome = AssertUnwindSafe(run()).catch_unwind() => {
                    if outcome.is_err() {
                        error!(queue = %shared.options.name, task = %name, "queue task panicked");
                        if let Some(task) = shared.take(id) {
                            (task.reject)(QueueError::Panicked);
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    debug!(queue = %shared.options.name, task = %name, "running task cancelled");
                }
            }

            shared.finish(id);

            if let Some(limit) = shared.options.warn_after {
                let elapsed = started.elapsed();
                if elapsed > limit {
                    warn!(
                        queue = %shared.options.name,
                        task = %name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "slow queue task"
                    );
                }
            }
        }
    }

    debug!(queue = %shared.options.name, "queue executor exited");
}

/// Serialized async task queue
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct AwaitQueue {
    shared: Arc<Shared>,
    mailbox: mpsc::UnboundedSender<()>,
}

impl fmt::Debug for AwaitQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwaitQueue")
            .field("name", &self.shared.options.name)
            .field("size", &self.size())
            .finish()
    }
}

impl AwaitQueue {
    /// Create a queue with default options
    ///
    /// Must be called within a Tokio runtime; the executor is spawned here.
    pub fn new() -> Self {
        Self::with_options(QueueOptions::default())
    }

    /// Create a queue with the given options
    pub fn with_options(options: QueueOptions) -> Self {
        let (mailbox, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            options,
            next_id: AtomicU64::new(0),
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                cancel: CancellationToken::new(),
            }),
        });

        tokio::spawn(run_executor(Arc::clone(&shared), receiver));

        Self { shared, mailbox }
    }

    /// Queue name
    pub fn name(&self) -> &str {
        &self.shared.options.name
    }

    /// Number of queued tasks, the running one included
    pub fn size(&self) -> usize {
        self.shared.state.lock().tasks.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Enqueue `task`; it runs after every previously pushed task settled
    ///
    /// The task is enqueued before this returns. Queue rejections are mapped
    /// into the task's own error type.
    pub fn push<T, E, F, Fut>(
        &self,
        name: impl Into<String>,
        task: F,
    ) -> impl Future<Output = Result<T, E>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<QueueError> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel::<Result<T, E>>();
        let settle = Arc::new(Mutex::new(Some(sender)));
        let on_done = Arc::clone(&settle);

        let run: TaskRunner = Box::new(move || {
            Box::pin(async move {
                let result = task().await;
                let sender = on_done.lock().take();
                if let Some(sender) = sender {
                    let _ = sender.send(result);
                }
            })
        });

        let reject: TaskRejecter = Box::new(move |error| {
            let sender = settle.lock().take();
            if let Some(sender) = sender {
                let _ = sender.send(Err(E::from(error)));
            }
        });

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let name = name.into();
        debug!(queue = %self.shared.options.name, task = %name, id, "task enqueued");

        self.shared.state.lock().tasks.push_back(PendingTask {
            id,
            name,
            enqueued_at: Instant::now(),
            executed_at: None,
            run: Some(run),
            reject,
        });

        if self.mailbox.send(()).is_err() {
            if let Some(task) = self.shared.take(id) {
                (task.reject)(QueueError::Stopped);
            }
        }

        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(E::from(QueueError::Stopped)))
        }
    }

    /// Reject every queued task, the running one included, and empty the queue
    pub fn stop(&self) {
        let (tasks, cancel) = {
            let mut state = self.shared.state.lock();
            let tasks: Vec<PendingTask> = state.tasks.drain(..).collect();
            let cancel = std::mem::replace(&mut state.cancel, CancellationToken::new());
            (tasks, cancel)
        };

        debug!(queue = %self.shared.options.name, tasks = tasks.len(), "queue stopped");

        for task in tasks {
            (task.reject)(QueueError::Stopped);
        }
        cancel.cancel();
    }

    /// Reject the not-yet-started task at `index`
    ///
    /// Returns `false` if there is no such task or it already started.
    pub fn remove(&self, index: usize) -> bool {
        let task = {
            let mut state = self.shared.state.lock();
            match state.tasks.get(index) {
                Some(task) if task.executed_at.is_none() => state.tasks.remove(index),
                _ => None,
            }
        };

        match task {
            Some(task) => {
                debug!(queue = %self.shared.options.name, task = %task.name, index, "task removed");
                (task.reject)(QueueError::Removed);
                true
            }
            None => false,
        }
    }

    /// Snapshot of every queued task
    pub fn dump(&self) -> Vec<TaskSnapshot> {
        let now = Instant::now();
        let state = self.shared.state.lock();

        state
            .tasks
            .iter()
            .enumerate()
            .map(|(index, task)| TaskSnapshot {
                index,
                id: task.id,
                name: task.name.clone(),
                enqueued_for: task
                    .executed_at
                    .unwrap_or(now)
                    .duration_since(task.enqueued_at),
                executing_for: task
                    .executed_at
                    .map(|at| now.duration_since(at))
                    .unwrap_or_default(),
            })
            .collect()
    }
}

impl Default for AwaitQueue {
    fn default() -> Self {
        Self::new()
    }
}
