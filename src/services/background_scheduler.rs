//! Priority task pool.
//!
//! A fixed-size pool of cooperative workers draining two queues: a
//! `BinaryHeap`-backed priority queue for `HIGH`/`CRITICAL` work, and a
//! `VecDeque` FIFO for `LOW`/`MEDIUM`. Workers always drain the priority
//! queue first.

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::errors::{OrchardError, OrchardResult};
use crate::domain::models::{BackgroundTask, BackgroundTaskStatus, Priority, ScheduledTask};
use crate::domain::ports::BackgroundHandler;

/// Rolling counters the scheduler exposes for observability.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SchedulerStats {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub queued: u64,
    pub active: u64,
    pub warming_hits: u64,
    pub cache_hits: u64,
}

impl SchedulerStats {
    pub fn success_rate(&self) -> f64 {
        let finished = self.completed + self.failed;
        if finished == 0 {
            0.0
        } else {
            self.completed as f64 / finished as f64
        }
    }

    pub fn warming_effectiveness(&self) -> f64 {
        if self.cache_hits == 0 {
            0.0
        } else {
            self.warming_hits as f64 / self.cache_hits as f64
        }
    }
}

struct Queues {
    priority: BinaryHeap<ScheduledTask>,
    fifo: VecDeque<BackgroundTask>,
    tasks: HashMap<Uuid, BackgroundTask>,
}

/// A bounded two-queue scheduler. Cloned handles share the same state via
/// `Arc`; workers are spawned by the caller (typically once at startup)
/// and call [`BackgroundScheduler::run_worker`] in a loop.
pub struct BackgroundScheduler {
    queues: Arc<Mutex<Queues>>,
    stats: Arc<Mutex<SchedulerStats>>,
    handlers: Arc<HashMap<&'static str, Arc<dyn BackgroundHandler>>>,
    max_queue_depth: usize,
    cancelled_flags: Arc<Mutex<HashMap<Uuid, Arc<AtomicBool>>>>,
}

impl BackgroundScheduler {
    pub fn new(handlers: Vec<Arc<dyn BackgroundHandler>>, max_queue_depth: usize) -> Self {
        let mut registry = HashMap::new();
        for handler in handlers {
            registry.insert(handler.task_type(), handler);
        }
        Self {
            queues: Arc::new(Mutex::new(Queues {
                priority: BinaryHeap::new(),
                fifo: VecDeque::new(),
                tasks: HashMap::new(),
            })),
            stats: Arc::new(Mutex::new(SchedulerStats::default())),
            handlers: Arc::new(registry),
            max_queue_depth,
            cancelled_flags: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn submit(
        &self,
        task_type: impl Into<String>,
        priority: Priority,
        scheduled_at: Option<chrono::DateTime<Utc>>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> OrchardResult<Uuid> {
        let mut task = BackgroundTask::new(task_type, priority);
        task.metadata = metadata;
        if let Some(at) = scheduled_at {
            task = task.scheduled_for(at);
        }
        let id = task.id;

        let mut queues = self.queues.lock().await;
        let depth = queues.priority.len() + queues.fifo.len();
        if depth >= self.max_queue_depth {
            return Err(OrchardError::ResourceExhaustion(format!(
                "queue_full: depth {depth} >= max {}",
                self.max_queue_depth
            )));
        }

        queues.tasks.insert(id, task.clone());
        if priority.is_fast_lane() {
            queues.priority.push(ScheduledTask {
                priority: task.priority,
                created_at: task.created_at,
                task,
            });
        } else {
            queues.fifo.push_back(task);
        }
        drop(queues);

        let mut stats = self.stats.lock().await;
        stats.total += 1;
        stats.queued += 1;
        Ok(id)
    }

    /// Succeeds only for `PENDING` tasks; `RUNNING` tasks complete naturally.
    pub async fn cancel(&self, task_id: Uuid) -> OrchardResult<bool> {
        let mut queues = self.queues.lock().await;
        if let Some(task) = queues.tasks.get_mut(&task_id) {
            if task.status == BackgroundTaskStatus::Pending {
                task.status = BackgroundTaskStatus::Cancelled;
                task.completed_at = Some(Utc::now());
                drop(queues);
                let mut stats = self.stats.lock().await;
                stats.cancelled += 1;
                stats.queued = stats.queued.saturating_sub(1);
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn stats(&self) -> SchedulerStats {
        self.stats.lock().await.clone()
    }

    /// Pops the next due task, preferring the priority queue. Not-yet-due
    /// tasks are skipped and re-enqueued.
    async fn next_due(&self) -> Option<BackgroundTask> {
        let now = Utc::now();
        let mut queues = self.queues.lock().await;

        if let Some(scheduled) = queues.priority.pop() {
            if scheduled.task.is_due(now) {
                return Some(scheduled.task);
            }
            queues.priority.push(scheduled);
            return None;
        }

        if let Some(task) = queues.fifo.pop_front() {
            if task.is_due(now) {
                return Some(task);
            }
            queues.fifo.push_back(task);
            return None;
        }

        None
    }

    /// One worker's run loop body: pop a task, dispatch to its registered
    /// handler, apply retry/failure rules. Returns `Ok(false)` when nothing
    /// was due so the caller can back off before polling again.
    pub async fn run_worker(&self) -> OrchardResult<bool> {
        let Some(mut task) = self.next_due().await else {
            return Ok(false);
        };

        task.status = BackgroundTaskStatus::Running;
        task.started_at = Some(Utc::now());
        {
            let mut queues = self.queues.lock().await;
            queues.tasks.insert(task.id, task.clone());
        }
        {
            let mut stats = self.stats.lock().await;
            stats.queued = stats.queued.saturating_sub(1);
            stats.active += 1;
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        self.cancelled_flags.lock().await.insert(task.id, cancelled.clone());

        let handler = self.handlers.get(task.task_type.as_str()).cloned();
        let outcome = match handler {
            Some(handler) => handler.handle(&task, &cancelled).await,
            None => Err(OrchardError::ContextBackgroundError(format!(
                "no handler registered for task_type {}",
                task.task_type
            ))),
        };

        self.cancelled_flags.lock().await.remove(&task.id);

        let mut stats = self.stats.lock().await;
        stats.active = stats.active.saturating_sub(1);

        match outcome {
            Ok(result) => {
                task.status = BackgroundTaskStatus::Completed;
                task.completed_at = Some(Utc::now());
                task.progress = 1.0;
                task.result = Some(result);
                stats.completed += 1;
            }
            Err(err) => {
                task.retry_count += 1;
                task.error = Some(err.to_string());
                if task.retry_count < task.max_retries {
                    task.status = BackgroundTaskStatus::Pending;
                    drop(stats);
                    let mut queues = self.queues.lock().await;
                    queues.tasks.insert(task.id, task.clone());
                    if task.priority.is_fast_lane() {
                        queues.priority.push(ScheduledTask {
                            priority: task.priority,
                            created_at: task.created_at,
                            task,
                        });
                    } else {
                        queues.fifo.push_back(task);
                    }
                    let mut stats = self.stats.lock().await;
                    stats.queued += 1;
                    return Ok(true);
                }
                task.status = BackgroundTaskStatus::Failed;
                task.completed_at = Some(Utc::now());
                stats.failed += 1;
            }
        }
        drop(stats);

        let mut queues = self.queues.lock().await;
        queues.tasks.insert(task.id, task);
        Ok(true)
    }
}
