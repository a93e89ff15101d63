//! Drain loops: claim tasks from one or more queues and hand them to a handler.
//!
//! `PersistentQueue::pop` never waits, so idle loops poll with `PollBackoff`.
//! With several queues (different priorities over one store) every poll tries
//! them from the highest priority down.

mod backoff;

pub use backoff::PollBackoff;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::WorkerConfig;
use crate::error::QueueError;
use crate::queue::TaskQueue;

/// Executes a claimed task.
///
/// The task has already left the queue when `handle` runs. Returning an error
/// only gets it logged and counted; re-queueing is up to the handler.
#[async_trait]
pub trait TaskHandler<T>: Send + Sync {
    async fn handle(&self, worker_id: usize, task: T) -> Result<(), String>;
}

/// When a drain loop stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopWhen {
    /// Keep polling until shutdown is requested.
    Shutdown,
    /// Stop at the first poll that finds every queue empty (or on shutdown).
    Empty,
}

/// Counters shared by every worker of a group.
#[derive(Debug, Default)]
struct Counters {
    claimed: AtomicU64,
    failed: AtomicU64,
    pop_errors: AtomicU64,
}

/// Totals reported when a group is joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Tasks taken off a queue and given to the handler.
    pub claimed: u64,
    /// Claimed tasks whose handler returned an error.
    pub failed: u64,
    /// Pops that failed for a reason other than an empty queue.
    pub pop_errors: u64,
}

/// Worker group handle.
/// - `request_shutdown` stops every loop after its current task
/// - `join` waits for all loops and returns the totals
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl WorkerGroup {
    /// Spawn `config.workers` loops over `queues`.
    pub fn spawn<T>(
        config: &WorkerConfig,
        mut queues: Vec<Arc<dyn TaskQueue<T>>>,
        handler: Arc<dyn TaskHandler<T>>,
        stop: StopWhen,
    ) -> Self
    where
        T: Send + 'static,
    {
        // sort_by_key は安定ソートなので、同じ priority のキューは渡された順
        queues.sort_by_key(|q| std::cmp::Reverse(q.priority()));
        let queues = Arc::new(queues);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counters = Arc::new(Counters::default());
        let backoff = PollBackoff::from_config(config);

        tracing::info!(workers = config.workers, queues = queues.len(), ?stop, "starting workers");

        let mut joins = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            let worker = DrainLoop {
                worker_id,
                queues: Arc::clone(&queues),
                handler: Arc::clone(&handler),
                counters: Arc::clone(&counters),
                backoff: backoff.clone(),
                stop,
            };
            let mut rx = shutdown_rx.clone();
            joins.push(tokio::spawn(async move {
                worker.run(&mut rx).await;
            }));
        }

        Self {
            shutdown_tx,
            joins,
            counters,
        }
    }

    /// Ask every loop to stop. In-flight handlers are not cancelled.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for every loop to finish on its own (`StopWhen::Empty`) or after
    /// `request_shutdown`.
    pub async fn join(self) -> DrainSummary {
        for join in self.joins {
            if let Err(e) = join.await {
                tracing::error!("worker task ended abnormally: {e}");
            }
        }
        DrainSummary {
            claimed: self.counters.claimed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            pop_errors: self.counters.pop_errors.load(Ordering::Relaxed),
        }
    }

    pub async fn shutdown_and_join(self) -> DrainSummary {
        self.request_shutdown();
        self.join().await
    }
}

struct DrainLoop<T> {
    worker_id: usize,
    queues: Arc<Vec<Arc<dyn TaskQueue<T>>>>,
    handler: Arc<dyn TaskHandler<T>>,
    counters: Arc<Counters>,
    backoff: PollBackoff,
    stop: StopWhen,
}

impl<T: Send + 'static> DrainLoop<T> {
    async fn run(self, shutdown_rx: &mut watch::Receiver<bool>) {
        let worker_id = self.worker_id;
        let mut empty_polls: u32 = 0;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            match self.claim().await {
                Ok(Some(task)) => {
                    empty_polls = 0;
                    self.counters.claimed.fetch_add(1, Ordering::Relaxed);
                    if let Err(e) = self.handler.handle(worker_id, task).await {
                        self.counters.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(worker_id, "task handler failed: {e}");
                    }
                    continue;
                }
                Ok(None) => {
                    if self.stop == StopWhen::Empty {
                        break;
                    }
                    empty_polls = empty_polls.saturating_add(1);
                }
                Err(e) => {
                    // ハンドルは index から外れている。レコードは次の recovery で戻る
                    self.counters.pop_errors.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(worker_id, "pop failed: {e}");
                    empty_polls = empty_polls.saturating_add(1);
                }
            }

            let delay = self.backoff.jittered_delay(empty_polls);
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    // sender dropped: nobody can ask us to stop any more
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::debug!(worker_id, "worker stopped");
    }

    /// Pop from the first non-empty queue, highest priority first.
    ///
    /// The queue is synchronous and may do disk I/O, so it runs on the blocking pool.
    async fn claim(&self) -> Result<Option<T>, QueueError> {
        let queues = Arc::clone(&self.queues);
        tokio::task::spawn_blocking(move || {
            for queue in queues.iter() {
                match queue.pop() {
                    Ok(task) => return Ok(Some(task)),
                    Err(QueueError::EmptyQueue) => continue,
                    Err(e) => return Err(e),
                }
            }
            Ok(None)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Task, TaskId, TaskType};
    use crate::impls::InMemoryStore;
    use crate::queue::PersistentQueue;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail_ids: Vec<String>,
    }

    #[async_trait]
    impl TaskHandler<Task> for Recorder {
        async fn handle(&self, _worker_id: usize, task: Task) -> Result<(), String> {
            let id = task.id.to_string();
            self.seen.lock().unwrap().push(id.clone());
            if self.fail_ids.contains(&id) {
                return Err(format!("refused {id}"));
            }
            Ok(())
        }
    }

    fn task(id: &str) -> Task {
        Task::new(
            TaskId::new(id),
            TaskType::Build,
            "plan",
            "case",
            Utc::now(),
            serde_json::Value::Null,
        )
    }

    fn queue(store: &InMemoryStore, priority: u8) -> Arc<PersistentQueue<Task>> {
        Arc::new(PersistentQueue::with_json(Arc::new(store.clone()), priority).unwrap())
    }

    #[tokio::test]
    async fn single_worker_drains_in_fifo_order() {
        let store = InMemoryStore::new();
        let q = queue(&store, 1);
        for id in ["a", "b", "c"] {
            q.push(&task(id)).unwrap();
        }

        let recorder = Arc::new(Recorder::default());
        let group = WorkerGroup::spawn(
            &WorkerConfig::default(),
            vec![q.clone() as Arc<dyn TaskQueue<Task>>],
            recorder.clone(),
            StopWhen::Empty,
        );
        let summary = group.join().await;

        assert_eq!(summary.claimed, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["a", "b", "c"]);
        assert!(q.is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn higher_priority_queue_is_drained_first() {
        // 別々のストア: 同じストアだと両方のキューが全件を recover する
        let low_store = InMemoryStore::new();
        let high_store = InMemoryStore::new();
        let low = queue(&low_store, 1);
        let high = queue(&high_store, 9);
        low.push(&task("low-1")).unwrap();
        high.push(&task("high-1")).unwrap();
        low.push(&task("low-2")).unwrap();
        high.push(&task("high-2")).unwrap();

        let recorder = Arc::new(Recorder::default());
        let summary = WorkerGroup::spawn(
            &WorkerConfig::default(),
            vec![
                low.clone() as Arc<dyn TaskQueue<Task>>,
                high.clone() as Arc<dyn TaskQueue<Task>>,
            ],
            recorder.clone(),
            StopWhen::Empty,
        )
        .join()
        .await;

        assert_eq!(summary.claimed, 4);
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec!["high-1", "high-2", "low-1", "low-2"]
        );
    }

    #[tokio::test]
    async fn handler_failures_are_counted_not_retried() {
        let store = InMemoryStore::new();
        let q = queue(&store, 1);
        q.push(&task("ok")).unwrap();
        q.push(&task("bad")).unwrap();

        let recorder = Arc::new(Recorder {
            fail_ids: vec!["bad".to_string()],
            ..Recorder::default()
        });
        let summary = WorkerGroup::spawn(
            &WorkerConfig::default(),
            vec![q.clone() as Arc<dyn TaskQueue<Task>>],
            recorder.clone(),
            StopWhen::Empty,
        )
        .join()
        .await;

        assert_eq!(summary.claimed, 2);
        assert_eq!(summary.failed, 1);
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn many_workers_claim_each_task_once() {
        let store = InMemoryStore::new();
        let q = queue(&store, 1);
        for i in 0..100 {
            q.push(&task(&format!("t{i:03}"))).unwrap();
        }

        let recorder = Arc::new(Recorder::default());
        let config = WorkerConfig {
            workers: 4,
            ..WorkerConfig::default()
        };
        let summary = WorkerGroup::spawn(
            &config,
            vec![q.clone() as Arc<dyn TaskQueue<Task>>],
            recorder.clone(),
            StopWhen::Empty,
        )
        .join()
        .await;

        assert_eq!(summary.claimed, 100);
        let mut seen = recorder.seen.lock().unwrap().clone();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 100);
    }

    #[tokio::test]
    async fn idle_workers_pick_up_late_pushes_and_stop_on_shutdown() {
        let store = InMemoryStore::new();
        let q = queue(&store, 1);

        let recorder = Arc::new(Recorder::default());
        let group = WorkerGroup::spawn(
            &WorkerConfig::default(),
            vec![q.clone() as Arc<dyn TaskQueue<Task>>],
            recorder.clone(),
            StopWhen::Shutdown,
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        q.push(&task("late")).unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !q.is_empty() || recorder.seen.lock().unwrap().is_empty() {
            assert!(tokio::time::Instant::now() < deadline, "late task never claimed");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let summary = tokio::time::timeout(Duration::from_secs(5), group.shutdown_and_join())
            .await
            .unwrap();
        assert_eq!(summary.claimed, 1);
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["late"]);
    }
}
