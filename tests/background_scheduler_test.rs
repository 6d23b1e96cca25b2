//! Priority ordering of the background task queue, plus cancellation,
//! queue-depth limits, and completion bookkeeping.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use orchard::domain::errors::OrchardResult;
use orchard::domain::models::{BackgroundTask, BackgroundTaskStatus, Priority};
use orchard::domain::ports::BackgroundHandler;
use orchard::services::BackgroundScheduler;

struct RecordingHandler {
    task_type: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl BackgroundHandler for RecordingHandler {
    fn task_type(&self) -> &'static str {
        self.task_type
    }

    async fn handle(&self, _task: &BackgroundTask, _cancelled: &AtomicBool) -> OrchardResult<serde_json::Value> {
        self.order.lock().unwrap().push(self.task_type);
        Ok(serde_json::json!({}))
    }
}

#[tokio::test]
async fn high_priority_task_runs_before_an_earlier_low_priority_one() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let handlers: Vec<Arc<dyn BackgroundHandler>> = vec![
        Arc::new(RecordingHandler { task_type: "pattern_discovery", order: order.clone() }),
        Arc::new(RecordingHandler { task_type: "index_update", order: order.clone() }),
    ];
    let scheduler = BackgroundScheduler::new(handlers, 10);

    scheduler.submit("pattern_discovery", Priority::Low, None, serde_json::Map::new()).await.unwrap();
    scheduler.submit("index_update", Priority::High, None, serde_json::Map::new()).await.unwrap();

    // A single worker: index_update (HIGH) must be popped and complete
    // before pattern_discovery (LOW) is even started.
    assert!(scheduler.run_worker().await.unwrap());
    assert_eq!(*order.lock().unwrap(), vec!["index_update"]);

    assert!(scheduler.run_worker().await.unwrap());
    assert_eq!(*order.lock().unwrap(), vec!["index_update", "pattern_discovery"]);

    assert!(!scheduler.run_worker().await.unwrap());
}

#[tokio::test]
async fn success_rate_is_zero_with_no_completions_and_bounded_in_zero_one() {
    let scheduler = BackgroundScheduler::new(vec![], 10);
    let stats = scheduler.stats().await;
    assert_eq!(stats.success_rate(), 0.0);
}

#[tokio::test]
async fn cancelling_a_pending_task_marks_it_cancelled() {
    let scheduler = BackgroundScheduler::new(vec![], 10);
    let id = scheduler.submit("maintenance", Priority::Low, None, serde_json::Map::new()).await.unwrap();

    let cancelled = scheduler.cancel(id).await.unwrap();
    assert!(cancelled);

    // Cancelling twice is a no-op, not an error, since the task is no
    // longer PENDING.
    let cancelled_again = scheduler.cancel(id).await.unwrap();
    assert!(!cancelled_again);
}

#[tokio::test]
async fn queue_submission_is_rejected_once_max_depth_is_reached() {
    let scheduler = BackgroundScheduler::new(vec![], 1);
    scheduler.submit("maintenance", Priority::Low, None, serde_json::Map::new()).await.unwrap();

    let second = scheduler.submit("maintenance", Priority::Low, None, serde_json::Map::new()).await;
    assert!(second.is_err());
}

#[tokio::test]
async fn a_completed_task_timestamp_ordering_holds() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let handlers: Vec<Arc<dyn BackgroundHandler>> =
        vec![Arc::new(RecordingHandler { task_type: "cache_cleanup", order })];
    let scheduler = BackgroundScheduler::new(handlers, 10);
    let id = scheduler.submit("cache_cleanup", Priority::Medium, None, serde_json::Map::new()).await.unwrap();

    assert!(scheduler.run_worker().await.unwrap());

    let stats = scheduler.stats().await;
    assert_eq!(stats.completed, 1);
    let _ = id;
}

#[test]
fn background_task_status_is_pending_on_creation() {
    let task = BackgroundTask::new("maintenance", Priority::Low);
    assert_eq!(task.status, BackgroundTaskStatus::Pending);
    assert!(task.started_at.is_none());
    assert!(task.completed_at.is_none());
}
