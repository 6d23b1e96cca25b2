//! Background maintenance tasks run by the scheduler's worker pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Priority tier for a background task. `HIGH`/`CRITICAL` are drained from
/// the priority queue before the FIFO queue is touched at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const fn is_fast_lane(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundTaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl BackgroundTaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Registered handler-dispatch type tags.
pub const TASK_TYPES: &[&str] = &[
    "index_update",
    "file_indexing",
    "cache_warming",
    "pattern_discovery",
    "learning_optimization",
    "cache_cleanup",
    "dependency_analysis",
    "performance_analysis",
    "maintenance",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundTask {
    pub id: Uuid,
    pub task_type: String,
    pub priority: Priority,
    pub status: BackgroundTaskStatus,
    pub created_at: DateTime<Utc>,
    /// When the task becomes eligible to run. Equal to `created_at` unless
    /// submitted with an explicit deferred `scheduled_at`.
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Progress in `[0, 1]`.
    pub progress: f64,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub max_retries: u32,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl BackgroundTask {
    pub fn new(task_type: impl Into<String>, priority: Priority) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            task_type: task_type.into(),
            priority,
            status: BackgroundTaskStatus::Pending,
            created_at: now,
            scheduled_at: now,
            started_at: None,
            completed_at: None,
            progress: 0.0,
            result: None,
            error: None,
            retry_count: 0,
            max_retries: 3,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = at;
        self
    }

    /// `is_overdue := scheduled_at < now AND status = PENDING`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == BackgroundTaskStatus::Pending && self.scheduled_at < now
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at <= now
    }
}

/// Ordering key for the priority queue: `(Priority desc, created_at asc)`.
///
/// A reversed-`Ord` wrapper so a `BinaryHeap` (a max-heap) pops the
/// highest-priority, oldest task first.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub task: BackgroundTask,
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.created_at == other.created_at
    }
}
impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: higher priority must compare greater,
        // and for equal priority the *older* task (smaller created_at) must
        // compare greater so it is popped first (FIFO within a priority).
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.created_at.cmp(&self.created_at))
    }
}
