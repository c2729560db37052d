//! Work Executors
//!
//! The capability the scheduler runs tasks against: an executor receives a
//! [`Reporter`] when its task is admitted, kicks off its work without
//! blocking, and reports zero or more progress updates followed by exactly
//! one terminal outcome.

use crate::domain::task::model::{TaskId, TaskProgress};
use std::time::Duration;
use tokio::sync::mpsc;

/// A report produced by an executor, routed back to the scheduler.
#[derive(Debug)]
pub(crate) enum Report {
    Progress {
        task_id: TaskId,
        progress: TaskProgress,
    },
    Finished {
        task_id: TaskId,
        outcome: Result<(), String>,
    },
}

/// Reporting sink handed to an executor at admission
///
/// Progress reports are advisory and may be sent any number of times; the
/// terminal methods consume the reporter, so an executor can report at most
/// one outcome. Dropping the reporter without a terminal report is treated
/// as a failure, so the task's concurrency slot is always released.
#[derive(Debug)]
pub struct Reporter {
    task_id: TaskId,
    tx: Option<mpsc::UnboundedSender<Report>>,
}

impl Reporter {
    pub(crate) fn new(task_id: TaskId, tx: mpsc::UnboundedSender<Report>) -> Self {
        Self {
            task_id,
            tx: Some(tx),
        }
    }

    /// Id of the task this reporter belongs to
    #[must_use]
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Report progress; `total == 0` while the total is unknown
    pub fn progress(&self, completed: u64, total: u64) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Report::Progress {
                task_id: self.task_id,
                progress: TaskProgress::new(completed, total),
            });
        }
    }

    /// Report successful completion
    pub fn succeed(mut self) {
        self.finish(Ok(()));
    }

    /// Report failure with an error message
    pub fn fail(mut self, error: impl Into<String>) {
        self.finish(Err(error.into()));
    }

    fn finish(&mut self, outcome: Result<(), String>) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Report::Finished {
                task_id: self.task_id,
                outcome,
            });
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.finish(Err(
                "executor dropped the reporter without reporting a result".to_string(),
            ));
        }
    }
}

/// A work executor
///
/// `start` is invoked exactly once per task, when the scheduler admits it.
/// It must return immediately; the actual work runs asynchronously and
/// reports back through the [`Reporter`].
pub trait Executor: Send + Sync {
    /// Begin the unit of work
    fn start(&self, reporter: Reporter);
}

impl<F> Executor for F
where
    F: Fn(Reporter) + Send + Sync,
{
    fn start(&self, reporter: Reporter) {
        self(reporter);
    }
}

/// Simulated transport for demos and tests
///
/// Sleeps for an initial delay, emits `steps` progress reports spaced by
/// `step_interval`, then succeeds or fails depending on configuration.
#[derive(Debug, Clone)]
pub struct MockExecutor {
    /// Delay before the first progress report
    pub delay: Duration,
    /// Number of progress reports to emit
    pub steps: u64,
    /// Pause between progress reports
    pub step_interval: Duration,
    /// When set, the task fails with this message instead of succeeding
    pub failure: Option<String>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            steps: 0,
            step_interval: Duration::ZERO,
            failure: None,
        }
    }
}

impl MockExecutor {
    /// A mock that succeeds immediately
    #[must_use]
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// A mock that fails immediately with the given message
    #[must_use]
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            failure: Some(error.into()),
            ..Self::default()
        }
    }

    /// Builder: initial delay before any report
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Builder: progress reports to emit and the pause between them
    #[must_use]
    pub fn with_steps(mut self, steps: u64, step_interval: Duration) -> Self {
        self.steps = steps;
        self.step_interval = step_interval;
        self
    }
}

impl Executor for MockExecutor {
    fn start(&self, reporter: Reporter) {
        let mock = self.clone();
        tokio::spawn(async move {
            if !mock.delay.is_zero() {
                tokio::time::sleep(mock.delay).await;
            }
            for step in 1..=mock.steps {
                reporter.progress(step, mock.steps);
                if !mock.step_interval.is_zero() {
                    tokio::time::sleep(mock.step_interval).await;
                }
            }
            match mock.failure {
                Some(error) => reporter.fail(error),
                None => reporter.succeed(),
            }
        });
    }
}
