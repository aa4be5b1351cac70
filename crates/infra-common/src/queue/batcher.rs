//! Coalescing of same-kind operations into batches
//!
//! A [`PendingTaskBatcher`] keeps an insertion-ordered set of pending items
//! keyed by id. The first enqueue after an idle period schedules a drain on
//! the runtime (`tokio::spawn`), so everything enqueued in the same turn ends
//! up in one batch. The drain hands the whole set to the processor, waits for
//! it, and repeats until nothing is pending.

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

type BatchProcessor<K, V> = Arc<dyn Fn(Vec<(K, V)>) -> BoxFuture<'static, ()> + Send + Sync>;

struct BatchState<K, V> {
    pending: IndexMap<K, V>,
    in_progress: bool,
    closed: bool,
}

struct Inner<K, V> {
    name: String,
    state: Mutex<BatchState<K, V>>,
    processor: BatchProcessor<K, V>,
}

/// Per-kind batcher in front of a task queue
pub struct PendingTaskBatcher<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for PendingTaskBatcher<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for PendingTaskBatcher<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PendingTaskBatcher")
            .field("name", &self.inner.name)
            .field("pending", &state.pending.len())
            .field("in_progress", &state.in_progress)
            .field("closed", &state.closed)
            .finish()
    }
}

impl<K, V> PendingTaskBatcher<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + 'static,
    V: Send + 'static,
{
    /// Create a batcher handing each batch to `processor`
    pub fn new<F, Fut>(name: impl Into<String>, processor: F) -> Self
    where
        F: Fn(Vec<(K, V)>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let processor: BatchProcessor<K, V> =
            Arc::new(move |batch: Vec<(K, V)>| -> BoxFuture<'static, ()> {
                Box::pin(processor(batch))
            });

        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                state: Mutex::new(BatchState {
                    pending: IndexMap::new(),
                    in_progress: false,
                    closed: false,
                }),
                processor,
            }),
        }
    }

    /// Add or replace a pending item; `false` once closed
    ///
    /// Must be called within a Tokio runtime.
    pub fn enqueue(&self, id: K, payload: V) -> bool {
        let schedule = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return false;
            }

            trace!(batcher = %self.inner.name, ?id, "item enqueued");
            state.pending.insert(id, payload);

            if state.in_progress {
                false
            } else {
                state.in_progress = true;
                true
            }
        };

        if schedule {
            tokio::spawn(Self::drain(Arc::clone(&self.inner)));
        }

        true
    }

    async fn drain(inner: Arc<Inner<K, V>>) {
        loop {
            let batch: Vec<(K, V)> = {
                let mut state = inner.state.lock();
                if state.pending.is_empty() {
                    state.in_progress = false;
                    return;
                }
                state.pending.drain(..).collect()
            };

            debug!(batcher = %inner.name, size = batch.len(), "processing batch");
            (inner.processor)(batch).await;
        }
    }

    /// Drop a pending item before it is batched
    pub fn remove(&self, id: &K) -> Option<V> {
        self.inner.state.lock().pending.shift_remove(id)
    }

    /// Whether `id` is pending
    pub fn contains(&self, id: &K) -> bool {
        self.inner.state.lock().pending.contains_key(id)
    }

    /// Number of pending items
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Whether a drain is scheduled or running
    pub fn in_progress(&self) -> bool {
        self.inner.state.lock().in_progress
    }

    /// Refuse further items and discard pending ones
    pub fn close(&self) -> Vec<(K, V)> {
        let mut state = self.inner.state.lock();
        state.closed = true;
        let dropped: Vec<(K, V)> = state.pending.drain(..).collect();
        debug!(batcher = %self.inner.name, dropped = dropped.len(), "batcher closed");
        dropped
    }

    /// Whether the batcher was closed
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }
}
