//! Background task handler port.
//!
//! Each registered `task_type` is backed by one
//! handler; the scheduler's worker pool looks handlers up by tag rather
//! than matching on the type string itself.

use async_trait::async_trait;

use crate::domain::errors::OrchardResult;
use crate::domain::models::BackgroundTask;

#[async_trait]
pub trait BackgroundHandler: Send + Sync {
    /// The `task_type` tag this handler services; must be one of
    /// [`crate::domain::models::background_task::TASK_TYPES`].
    fn task_type(&self) -> &'static str;

    /// Runs the task to completion, returning the JSON result payload to
    /// store on [`BackgroundTask::result`]. Implementations should poll
    /// `cancelled` at checkpoints for long-running work.
    async fn handle(
        &self,
        task: &BackgroundTask,
        cancelled: &std::sync::atomic::AtomicBool,
    ) -> OrchardResult<serde_json::Value>;
}
