//! OffloadManager implementation for background task execution.

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use smol_str::SmolStr;
use tessera_core::Offload;
use tokio::sync::{Notify, Semaphore, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{Instrument, info_span, warn};

use super::policy::{OffloadConfig, TimeoutPolicy};
use crate::metrics;

/// Identifies one offloaded task: its kind plus a sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffloadKey {
    /// Kind of the task (e.g. "cache_upsert", "cache_remove").
    pub kind: SmolStr,
    /// Unique identifier within the manager.
    pub id: u64,
}

/// Handle to a spawned offload task.
#[derive(Debug)]
pub struct OffloadHandle {
    handle: JoinHandle<()>,
}

impl OffloadHandle {
    /// Check if the task is finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the task.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

#[derive(Debug)]
struct OffloadManagerInner {
    config: OffloadConfig,
    tasks: DashMap<OffloadKey, OffloadHandle>,
    slots: Option<Arc<Semaphore>>,
    key_counter: AtomicU64,
    idle: Notify,
}

impl OffloadManagerInner {
    fn release(&self, key: &OffloadKey) {
        self.tasks.remove(key);
        if self.tasks.is_empty() {
            self.idle.notify_waiters();
        }
    }
}

/// Untracks a task when its future completes or is dropped by an abort.
struct TaskGuard {
    inner: Arc<OffloadManagerInner>,
    key: OffloadKey,
    start: Instant,
    completed: bool,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        metrics::record_offload_finished(&self.key.kind, self.start.elapsed(), self.completed);
        self.inner.release(&self.key);
    }
}

/// Manager for offloading tasks to background execution.
///
/// Every spawned task is a detached tokio task: it keeps running when the
/// operation that spawned it returns or is dropped. Use [`wait_all`] to wait
/// for in-flight work, e.g. before shutting the process down.
///
/// Spawning requires a running tokio runtime.
///
/// [`wait_all`]: OffloadManager::wait_all
#[derive(Clone, Debug)]
pub struct OffloadManager {
    inner: Arc<OffloadManagerInner>,
}

impl OffloadManager {
    /// Create a new OffloadManager with the given configuration.
    pub fn new(config: OffloadConfig) -> Self {
        let slots = config
            .max_concurrent_tasks
            .map(|max| Arc::new(Semaphore::new(max.max(1))));
        Self {
            inner: Arc::new(OffloadManagerInner {
                config,
                tasks: DashMap::new(),
                slots,
                key_counter: AtomicU64::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Create a new OffloadManager with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(OffloadConfig::default())
    }

    /// Returns the configuration the manager was created with.
    pub fn config(&self) -> &OffloadConfig {
        &self.inner.config
    }

    fn next_key(&self, kind: impl Into<SmolStr>) -> OffloadKey {
        let id = self.inner.key_counter.fetch_add(1, Ordering::Relaxed);
        OffloadKey {
            kind: kind.into(),
            id,
        }
    }

    /// Spawn a task of the given kind.
    ///
    /// The kind is used for metrics labels and tracing. Tasks are never
    /// deduplicated: two writes for the same cache entry both run.
    pub fn spawn<F>(&self, kind: impl Into<SmolStr>, task: F) -> OffloadKey
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = self.next_key(kind);
        let (registered, handle) = self.spawn_inner(task, key.clone());
        metrics::record_offload_spawned(&key.kind);
        self.inner.tasks.insert(key.clone(), handle);
        // The task untracks itself on exit, so it may only start once tracked.
        let _ = registered.send(());
        key
    }

    /// Get the number of currently active tasks.
    pub fn active_task_count(&self) -> usize {
        self.inner.tasks.iter().filter(|e| !e.is_finished()).count()
    }

    /// Get the total number of tracked tasks (including finished).
    pub fn total_task_count(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Clean up finished task handles.
    pub fn cleanup_finished(&self) {
        self.inner.tasks.retain(|_, handle| !handle.is_finished());
    }

    /// Cancel all running tasks.
    ///
    /// Aborted tasks are untracked once the runtime drops them.
    pub fn cancel_all(&self) {
        let handles: Vec<AbortHandle> = self
            .inner
            .tasks
            .iter()
            .map(|entry| entry.handle.abort_handle())
            .collect();
        for handle in handles {
            handle.abort();
        }
    }

    /// Cancel a specific task by key.
    pub fn cancel(&self, key: &OffloadKey) -> bool {
        let handle = self.inner.tasks.get(key).map(|entry| entry.handle.abort_handle());
        match handle {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Check if a task with the given key is in flight.
    pub fn is_in_flight(&self, key: &OffloadKey) -> bool {
        self.inner.tasks.get(key).is_some_and(|h| !h.is_finished())
    }

    /// Wait for all currently tracked tasks to complete.
    ///
    /// Tasks spawned while waiting are waited for too.
    pub async fn wait_all(&self) {
        loop {
            let mut idle = pin!(self.inner.idle.notified());
            idle.as_mut().enable();
            self.cleanup_finished();
            if self.inner.tasks.is_empty() {
                break;
            }
            idle.await;
        }
    }

    /// Wait for all tasks with a timeout.
    ///
    /// Returns `true` if all tasks completed within the timeout,
    /// `false` if the timeout was reached.
    pub async fn wait_all_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_all()).await.is_ok()
    }

    fn spawn_inner<F>(&self, task: F, key: OffloadKey) -> (oneshot::Sender<()>, OffloadHandle)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (registered, tracked) = oneshot::channel();
        let span = info_span!("offload_task", kind = %key.kind, id = key.id);
        let mut guard = TaskGuard {
            inner: self.inner.clone(),
            key,
            start: Instant::now(),
            completed: false,
        };

        let handle = tokio::spawn(
            async move {
                let _ = tracked.await;
                let permit = match &guard.inner.slots {
                    Some(slots) => slots.clone().acquire_owned().await.ok(),
                    None => None,
                };
                guard.start = Instant::now();
                let policy = guard.inner.config.timeout_policy;
                guard.completed = run_with_policy(policy, task, &guard.key).await;
                drop(permit);
                drop(guard);
            }
            .instrument(span),
        );

        (registered, OffloadHandle { handle })
    }
}

/// Runs `task` under `policy`, returning `false` if it was cut short.
async fn run_with_policy<F>(policy: TimeoutPolicy, task: F, key: &OffloadKey) -> bool
where
    F: Future<Output = ()>,
{
    match policy {
        TimeoutPolicy::None => {
            task.await;
            true
        }
        TimeoutPolicy::Cancel(duration) => match tokio::time::timeout(duration, task).await {
            Ok(()) => true,
            Err(_) => {
                warn!(?key, "Offload task cancelled due to timeout");
                false
            }
        },
        TimeoutPolicy::Warn(duration) => {
            let start = Instant::now();
            task.await;
            let elapsed = start.elapsed();
            if elapsed > duration {
                warn!(
                    ?key,
                    elapsed_ms = elapsed.as_millis(),
                    threshold_ms = duration.as_millis(),
                    "Offload task exceeded timeout threshold"
                );
            }
            true
        }
    }
}

impl Default for OffloadManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Offload for OffloadManager {
    fn spawn<F>(&self, kind: impl Into<SmolStr>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        OffloadManager::spawn(self, kind, future);
    }

    async fn drain(&self) {
        self.wait_all().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn wait_all_observes_spawned_work() {
        let manager = OffloadManager::default();
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let done = done.clone();
            manager.spawn("cache_upsert", async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        manager.wait_all().await;
        assert_eq!(done.load(Ordering::SeqCst), 10);
        assert_eq!(manager.total_task_count(), 0);
    }

    #[tokio::test]
    async fn keys_are_unique_per_spawn() {
        let manager = OffloadManager::default();
        let first = manager.spawn("cache_upsert", async {});
        let second = manager.spawn("cache_upsert", async {});
        assert_ne!(first, second);
        assert_eq!(first.kind, "cache_upsert");
        manager.wait_all().await;
    }

    #[tokio::test]
    async fn cancel_policy_stops_slow_tasks() {
        let manager = OffloadManager::new(
            OffloadConfig::default().timeout(Duration::from_millis(50)),
        );
        let done = Arc::new(AtomicUsize::new(0));
        let flag = done.clone();
        manager.spawn("cache_upsert", async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            flag.fetch_add(1, Ordering::SeqCst);
        });
        manager.wait_all().await;
        assert_eq!(done.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn warn_policy_lets_tasks_finish() {
        let manager = OffloadManager::new(
            OffloadConfig::default().timeout_policy(TimeoutPolicy::Warn(Duration::from_millis(10))),
        );
        let done = Arc::new(AtomicUsize::new(0));
        let flag = done.clone();
        manager.spawn("cache_upsert", async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag.fetch_add(1, Ordering::SeqCst);
        });
        manager.wait_all().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let manager = OffloadManager::new(OffloadConfig::default().max_concurrent_tasks(2));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let running = running.clone();
            let peak = peak.clone();
            manager.spawn("cache_upsert", async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        manager.wait_all().await;
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn finished_tasks_are_untracked_on_multi_thread_runtime() {
        let manager = OffloadManager::default();
        for _ in 0..20_000 {
            manager.spawn("cache_upsert", async {});
        }
        let settled = tokio::time::timeout(Duration::from_secs(10), async {
            while manager.active_task_count() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(settled.is_ok());
        assert_eq!(manager.total_task_count(), 0);
    }

    #[tokio::test]
    async fn cancel_untracks_aborted_task() {
        let manager = OffloadManager::default();
        let key = manager.spawn("cache_upsert", std::future::pending());
        let other = manager.spawn("cache_remove", std::future::pending());
        assert!(manager.cancel(&key));
        let settled = tokio::time::timeout(Duration::from_secs(1), async {
            while manager.total_task_count() > 1 {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(settled.is_ok());
        assert!(manager.is_in_flight(&other));
        assert!(!manager.cancel(&key));
        manager.cancel_all();
        assert!(manager.wait_all_timeout(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn cancel_all_aborts_pending_tasks() {
        let manager = OffloadManager::default();
        let key = manager.spawn("cache_upsert", std::future::pending());
        assert!(manager.is_in_flight(&key));
        manager.cancel_all();
        assert!(manager.wait_all_timeout(Duration::from_secs(1)).await);
        assert!(!manager.is_in_flight(&key));
    }
}
