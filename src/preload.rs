//! Background preloading.
//!
//! A bounded, priority-ordered task queue drained by a small worker pool.
//! Workers wait for the foreground gauge to reach zero before running a
//! task, so resolution requests always go first.

use serde::Serialize;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::jurisdiction::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Predictive,
    Refresh,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum PreloadTask {
    /// Committee detail for a representative that was just resolved.
    Committees { rep_id: String },
    /// Re-fetch one level for one postal code.
    LevelRefresh { level: Level, postal_code: String },
}

struct Queued {
    priority: Priority,
    seq: u64,
    task: PreloadTask,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // Higher priority first, then FIFO.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ─── Foreground gauge ───────────────────────────────────────────

/// Counts in-flight foreground resolutions.
#[derive(Default)]
pub struct ForegroundGauge {
    active: AtomicUsize,
    idle: Notify,
}

pub struct ForegroundGuard {
    gauge: Arc<ForegroundGauge>,
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        if self.gauge.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.gauge.idle.notify_waiters();
        }
    }
}

impl ForegroundGauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn enter(self: &Arc<Self>) -> ForegroundGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ForegroundGuard {
            gauge: Arc::clone(self),
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }
}

// ─── Queue ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub queued: usize,
    pub enqueued: u64,
    pub dropped: u64,
    pub completed: u64,
}

struct QueueState {
    heap: BinaryHeap<Queued>,
    next_seq: u64,
    closed: bool,
}

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

pub type TaskHandler = Arc<dyn Fn(PreloadTask) -> BoxFuture + Send + Sync>;

pub struct PreloadQueue {
    state: Mutex<QueueState>,
    capacity: usize,
    available: Notify,
    gauge: Arc<ForegroundGauge>,
    enqueued: AtomicU64,
    dropped: AtomicU64,
    completed: AtomicU64,
}

impl PreloadQueue {
    pub fn new(capacity: usize, gauge: Arc<ForegroundGauge>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                closed: false,
            }),
            capacity: capacity.max(1),
            available: Notify::new(),
            gauge,
            enqueued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a task. When full, the lowest-priority entry makes room for
    /// a higher-priority one; otherwise the new task is dropped.
    pub fn push(&self, task: PreloadTask, priority: Priority) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        if state.heap.iter().any(|q| q.task == task && q.priority >= priority) {
            return true;
        }
        if state.heap.len() >= self.capacity {
            let lowest = state.heap.iter().map(|q| (q.priority, std::cmp::Reverse(q.seq))).min();
            match lowest {
                Some((p, std::cmp::Reverse(seq))) if p < priority => {
                    let kept: Vec<Queued> = std::mem::take(&mut state.heap)
                        .into_vec()
                        .into_iter()
                        .filter(|q| q.seq != seq)
                        .collect();
                    state.heap = kept.into();
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                _ => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    debug!(?task, "preload queue full; task dropped");
                    return false;
                }
            }
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Queued { priority, seq, task });
        drop(state);
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        self.available.notify_one();
        true
    }

    /// Next task by priority; `None` once the queue is shut down.
    pub async fn pop(&self) -> Option<PreloadTask> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(q) = state.heap.pop() {
                    return Some(q.task);
                }
            }
            notified.await;
        }
    }

    pub fn try_pop(&self) -> Option<PreloadTask> {
        self.lock().heap.pop().map(|q| q.task)
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            queued: self.len(),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting work and release idle workers. Queued tasks are discarded.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.closed = true;
        let discarded = state.heap.len();
        state.heap.clear();
        drop(state);
        if discarded > 0 {
            warn!(discarded, "preload queue shut down with pending tasks");
        }
        self.available.notify_waiters();
    }

    pub fn spawn_workers(self: &Arc<Self>, workers: usize, handler: TaskHandler) -> Vec<JoinHandle<()>> {
        (0..workers.max(1))
            .map(|id| {
                let queue = Arc::clone(self);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    while let Some(task) = queue.pop().await {
                        queue.gauge.wait_idle().await;
                        debug!(worker = id, ?task, "preload task started");
                        handler(task).await;
                        queue.completed.fetch_add(1, Ordering::Relaxed);
                    }
                    debug!(worker = id, "preload worker stopped");
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn committees(id: &str) -> PreloadTask {
        PreloadTask::Committees { rep_id: id.into() }
    }

    #[test]
    fn test_priority_then_fifo() {
        let q = PreloadQueue::new(8, ForegroundGauge::new());
        q.push(committees("a"), Priority::Predictive);
        q.push(committees("b"), Priority::Predictive);
        q.push(
            PreloadTask::LevelRefresh {
                level: Level::County,
                postal_code: "95814".into(),
            },
            Priority::Emergency,
        );
        q.push(committees("c"), Priority::Refresh);
        let order: Vec<PreloadTask> = std::iter::from_fn(|| q.try_pop()).collect();
        assert!(matches!(order[0], PreloadTask::LevelRefresh { .. }));
        assert_eq!(order[1], committees("c"));
        assert_eq!(order[2], committees("a"));
        assert_eq!(order[3], committees("b"));
    }

    #[test]
    fn test_bounded_capacity_evicts_lowest() {
        let q = PreloadQueue::new(2, ForegroundGauge::new());
        assert!(q.push(committees("a"), Priority::Predictive));
        assert!(q.push(committees("b"), Priority::Predictive));
        assert!(!q.push(committees("c"), Priority::Predictive));
        assert!(q.push(committees("d"), Priority::Emergency));
        assert_eq!(q.len(), 2);
        // the newest predictive task made room
        assert_eq!(q.try_pop(), Some(committees("d")));
        assert_eq!(q.try_pop(), Some(committees("a")));
        assert_eq!(q.stats().dropped, 2);
    }

    #[test]
    fn test_duplicate_is_coalesced() {
        let q = PreloadQueue::new(4, ForegroundGauge::new());
        q.push(committees("a"), Priority::Predictive);
        q.push(committees("a"), Priority::Predictive);
        assert_eq!(q.len(), 1);
    }

    #[tokio::test]
    async fn test_workers_wait_for_foreground() {
        let gauge = ForegroundGauge::new();
        let q = PreloadQueue::new(4, Arc::clone(&gauge));
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        let handler: TaskHandler = Arc::new(move |_task: PreloadTask| -> BoxFuture {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });
        let guard = gauge.enter();
        let workers = q.spawn_workers(1, handler);
        q.push(committees("a"), Priority::Predictive);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        drop(guard);
        for _ in 0..50 {
            if ran.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);

        q.shutdown();
        for w in workers {
            w.await.unwrap();
        }
        assert!(!q.push(committees("b"), Priority::Predictive));
    }
}
