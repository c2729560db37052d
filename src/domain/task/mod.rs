//! Task Scheduling
//!
//! Task model, executors, admission-controlled scheduling, and
//! subscription-based state change notification.

pub mod executor;
pub mod group;
pub mod model;
pub mod scheduler;
pub mod subscription;

pub use executor::{Executor, MockExecutor, Reporter};
pub use group::{GroupAggregator, GroupOutcome};
pub use model::{GroupId, Task, TaskId, TaskInfo, TaskProgress, TaskState};
pub use scheduler::{SchedulerConfig, SchedulerSnapshot, TaskScheduler};
pub use subscription::{ObserverId, SchedulerEvent, Subscriber};
