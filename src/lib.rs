//! Taskgate
//!
//! A bounded-concurrency task scheduler. Tasks are units of asynchronous
//! work with identity, an explicit lifecycle, and optional group
//! membership; the scheduler admits at most `max_concurrent` of them at a
//! time and fans out typed state-change events to subscribed observers,
//! including a single aggregate event when a whole group resolves.
//!
//! ```no_run
//! use taskgate::{MockExecutor, SchedulerConfig, Task, TaskScheduler};
//!
//! # async fn demo() -> Result<(), taskgate::SchedulerError> {
//! let scheduler = TaskScheduler::new(SchedulerConfig::default())?;
//!
//! let mut sub = scheduler.subscriber();
//! scheduler.subscribe_group(sub.id(), "uploads");
//!
//! let tasks: Vec<Task> = (0..5)
//!     .map(|_| Task::new(MockExecutor::succeeding()).with_group("uploads"))
//!     .collect();
//! scheduler.add_tasks(tasks)?;
//!
//! // One aggregate event once all five resolve.
//! let done = sub.recv().await;
//! println!("{done:?}");
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod error;

pub use domain::task::{
    Executor, GroupId, MockExecutor, ObserverId, Reporter, SchedulerConfig, SchedulerEvent,
    SchedulerSnapshot, Subscriber, Task, TaskId, TaskInfo, TaskProgress, TaskScheduler, TaskState,
};
pub use error::{SchedulerError, SchedulerResult};
