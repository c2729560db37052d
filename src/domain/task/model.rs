//! Task Model
//!
//! Core data structures for scheduled tasks.

use crate::domain::task::executor::Executor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Task identifier
pub type TaskId = Uuid;

/// Group identifier shared by tasks whose completion is reported in aggregate
pub type GroupId = String;

/// Progress of a working task
///
/// `total == 0` means the executor has not yet learned the total
/// (unknown-total sentinel before the first sized progress report).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskProgress {
    /// Units completed so far
    pub completed: u64,
    /// Total units, 0 while unknown
    pub total: u64,
}

impl TaskProgress {
    /// Create a progress value
    ///
    /// Once the total is known, `completed` must not exceed it.
    #[must_use]
    pub fn new(completed: u64, total: u64) -> Self {
        debug_assert!(
            total == 0 || completed <= total,
            "progress completed ({completed}) exceeds known total ({total})"
        );
        Self { completed, total }
    }

    /// Completion ratio in `[0.0, 1.0]`, `None` while the total is unknown
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.completed as f64 / self.total as f64)
        }
    }
}

/// Task lifecycle state
///
/// Mutated only by the scheduler; executors report transitions through
/// their [`Reporter`](crate::domain::task::executor::Reporter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Task is awaiting or has just been admitted for execution
    Ready,
    /// Task is executing; payload is the latest progress report
    Working(TaskProgress),
    /// Task completed successfully
    Success,
    /// Task failed with an error message
    Failure(String),
}

impl TaskState {
    /// Check if the state is terminal
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure(_))
    }

    /// Check if the task is currently executing
    #[must_use]
    pub fn is_working(&self) -> bool {
        matches!(self, TaskState::Working(_))
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Ready => write!(f, "ready"),
            TaskState::Working(_) => write!(f, "working"),
            TaskState::Success => write!(f, "success"),
            TaskState::Failure(_) => write!(f, "failure"),
        }
    }
}

/// A unit of asynchronous work
///
/// Holds identity, optional group membership, and the executor that performs
/// the actual work once the scheduler admits the task.
#[derive(Clone)]
pub struct Task {
    id: TaskId,
    group_id: Option<GroupId>,
    created_at: DateTime<Utc>,
    executor: Arc<dyn Executor>,
}

impl Task {
    /// Create a task around an executor
    pub fn new(executor: impl Executor + 'static) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id: None,
            created_at: Utc::now(),
            executor: Arc::new(executor),
        }
    }

    /// Builder: assign the task to a group
    #[must_use]
    pub fn with_group(mut self, group_id: impl Into<GroupId>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Get the task id
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Get the group id, if any
    #[must_use]
    pub fn group_id(&self) -> Option<&GroupId> {
        self.group_id.as_ref()
    }

    /// Get the creation timestamp
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn into_parts(self) -> (TaskInfo, Arc<dyn Executor>) {
        let info = TaskInfo {
            id: self.id,
            group_id: self.group_id,
            created_at: self.created_at,
            state: TaskState::Ready,
        };
        (info, self.executor)
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

impl std::hash::Hash for Task {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("group_id", &self.group_id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Read-only view of a task's bookkeeping
///
/// Snapshots and queries hand these out; callers never receive live
/// references into scheduler state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Task identifier
    pub id: TaskId,
    /// Group membership, if any
    pub group_id: Option<GroupId>,
    /// Submission timestamp
    pub created_at: DateTime<Utc>,
    /// State at snapshot time
    pub state: TaskState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::executor::Reporter;

    fn noop_executor() -> impl Executor {
        |reporter: Reporter| reporter.succeed()
    }

    #[test]
    fn test_task_creation() {
        let task = Task::new(noop_executor());
        assert!(task.group_id().is_none());
    }

    #[test]
    fn test_task_builder_group() {
        let task = Task::new(noop_executor()).with_group("batch-1");
        assert_eq!(task.group_id().map(String::as_str), Some("batch-1"));
    }

    #[test]
    fn test_task_identity_by_id() {
        let a = Task::new(noop_executor());
        let b = Task::new(noop_executor());
        assert_ne!(a.id(), b.id());
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_state_checks() {
        assert!(TaskState::Success.is_terminal());
        assert!(TaskState::Failure("boom".into()).is_terminal());
        assert!(!TaskState::Ready.is_terminal());
        assert!(!TaskState::Working(TaskProgress::default()).is_terminal());
        assert!(TaskState::Working(TaskProgress::new(1, 2)).is_working());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(TaskState::Ready.to_string(), "ready");
        assert_eq!(TaskState::Failure("x".into()).to_string(), "failure");
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(TaskProgress::new(5, 10).fraction(), Some(0.5));
        assert_eq!(TaskProgress::new(3, 0).fraction(), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "exceeds known total")]
    fn test_progress_beyond_known_total_asserts() {
        let _ = TaskProgress::new(11, 10);
    }
}
