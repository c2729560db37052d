//! Task Scheduler
//!
//! Admission-controlled task runner: tasks queue up as ready, at most
//! `max_concurrent` of them execute at once, and every state transition
//! fans out to subscribed observers as a typed event.
//!
//! Internals follow a two-queue design: callers mutate shared state under a
//! single lock (submission, subscription, configuration), while executor
//! reports flow through one mpsc channel consumed by a spawned pump task,
//! which serializes all transition handling. Observers receive events on
//! their own channels and never run inside the scheduler's lock.

use crate::domain::task::executor::{Executor, Report, Reporter};
use crate::domain::task::group::GroupAggregator;
use crate::domain::task::model::{GroupId, Task, TaskId, TaskInfo, TaskState};
use crate::domain::task::subscription::{
    ObserverId, SchedulerEvent, Subscriber, SubscriptionRegistry,
};
use crate::error::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of concurrently working tasks; must be at least 1
    pub max_concurrent: usize,
    /// Forward a task's non-terminal `Working` events to subscribers of its
    /// group. Group subscribers always receive the single group-completion
    /// event regardless of this setting.
    pub notify_group_on_progress: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            notify_group_on_progress: false,
        }
    }
}

/// Read-only copy of the scheduler's queues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    /// Tasks awaiting admission, in admission order
    pub ready: Vec<TaskInfo>,
    /// Tasks currently executing, ordered by submission time
    pub working: Vec<TaskInfo>,
    /// Terminal tasks, in completion order
    pub finished: Vec<TaskInfo>,
}

struct TaskRecord {
    info: TaskInfo,
    executor: Arc<dyn Executor>,
}

struct SchedulerInner {
    config: SchedulerConfig,
    /// All tasks ever submitted, keyed by id; backs duplicate detection
    tasks: HashMap<TaskId, TaskRecord>,
    ready: VecDeque<TaskId>,
    working: HashSet<TaskId>,
    finished: Vec<TaskId>,
    subscriptions: SubscriptionRegistry,
    groups: GroupAggregator,
    report_tx: mpsc::UnboundedSender<Report>,
}

/// Bounded-concurrency task scheduler
///
/// Cheaply cloneable handle over shared state. Must be created inside a
/// Tokio runtime (the report pump is spawned at construction). Once every
/// handle is dropped and all outstanding executors have reported, the pump
/// task ends on its own.
#[derive(Clone)]
pub struct TaskScheduler {
    inner: Arc<Mutex<SchedulerInner>>,
}

impl TaskScheduler {
    /// Create a scheduler and spawn its report pump
    ///
    /// Fails with [`SchedulerError::InvalidConfiguration`] when
    /// `max_concurrent` is zero.
    pub fn new(config: SchedulerConfig) -> SchedulerResult<Self> {
        if config.max_concurrent == 0 {
            return Err(SchedulerError::InvalidConfiguration {
                reason: "max_concurrent must be at least 1".to_string(),
            });
        }

        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Mutex::new(SchedulerInner {
            config,
            tasks: HashMap::new(),
            ready: VecDeque::new(),
            working: HashSet::new(),
            finished: Vec::new(),
            subscriptions: SubscriptionRegistry::new(),
            groups: GroupAggregator::new(),
            report_tx,
        }));

        tokio::spawn(run_reports(Arc::downgrade(&inner), report_rx));
        Ok(Self { inner })
    }

    /// Submit a single task
    ///
    /// The task enters the ready queue (and its group's member count, if
    /// any) and admission runs immediately. A task id already known to this
    /// scheduler — ready, working, or finished — is rejected with
    /// [`SchedulerError::DuplicateTask`] and no state change.
    pub fn add_task(&self, task: Task) -> SchedulerResult<TaskId> {
        let id = task.id();
        self.add_tasks(vec![task])?;
        Ok(id)
    }

    /// Submit a batch of tasks in order
    ///
    /// All-or-nothing: a duplicate id anywhere in the batch (against the
    /// scheduler or within the batch itself) rejects the whole batch with
    /// no state change.
    pub fn add_tasks(&self, tasks: Vec<Task>) -> SchedulerResult<Vec<TaskId>> {
        let starts;
        let ids;
        {
            let mut inner = self.inner.lock().unwrap();

            let mut batch_ids = HashSet::new();
            for task in &tasks {
                if inner.tasks.contains_key(&task.id()) || !batch_ids.insert(task.id()) {
                    return Err(SchedulerError::DuplicateTask { id: task.id() });
                }
            }

            ids = tasks.iter().map(Task::id).collect();
            for task in tasks {
                let id = task.id();
                let (info, executor) = task.into_parts();
                if let Some(group_id) = &info.group_id {
                    inner.groups.register(group_id);
                }
                debug!(task = %id, group = ?info.group_id, "task submitted");
                inner.tasks.insert(id, TaskRecord { info, executor });
                inner.ready.push_back(id);
            }

            starts = admit(&mut inner);
        }
        start_all(starts);
        Ok(ids)
    }

    /// Change the admission cap
    ///
    /// A decrease never preempts tasks that are already working; it only
    /// throttles future admission. An increase admits from the ready queue
    /// immediately.
    pub fn set_max_concurrent(&self, max_concurrent: usize) -> SchedulerResult<()> {
        if max_concurrent == 0 {
            return Err(SchedulerError::InvalidConfiguration {
                reason: "max_concurrent must be at least 1".to_string(),
            });
        }

        let starts = {
            let mut inner = self.inner.lock().unwrap();
            inner.config.max_concurrent = max_concurrent;
            admit(&mut inner)
        };
        start_all(starts);
        Ok(())
    }

    /// Register a new observer and return its event handle
    pub fn subscriber(&self) -> Subscriber {
        self.inner.lock().unwrap().subscriptions.register()
    }

    /// Declare interest in a single task; idempotent
    pub fn subscribe_task(&self, observer: ObserverId, task_id: TaskId) {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .subscribe_task(observer, task_id);
    }

    /// Declare interest in a group's completion; idempotent
    pub fn subscribe_group(&self, observer: ObserverId, group_id: impl Into<GroupId>) {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .subscribe_group(observer, group_id.into());
    }

    /// Remove interest in one task
    pub fn unsubscribe_task(&self, observer: ObserverId, task_id: TaskId) {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .unsubscribe_task(observer, task_id);
    }

    /// Remove interest in one group
    pub fn unsubscribe_group(&self, observer: ObserverId, group_id: impl Into<GroupId>) {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .unsubscribe_group(observer, &group_id.into());
    }

    /// Remove every subscription held by an observer
    pub fn unsubscribe_all(&self, observer: ObserverId) {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .unsubscribe_all(observer);
    }

    /// Read-only copy of the three queues; no side effects
    pub fn snapshot(&self) -> SchedulerSnapshot {
        let inner = self.inner.lock().unwrap();

        let collect = |ids: &mut dyn Iterator<Item = &TaskId>| -> Vec<TaskInfo> {
            ids.filter_map(|id| inner.tasks.get(id).map(|r| r.info.clone()))
                .collect()
        };

        let ready = collect(&mut inner.ready.iter());
        let mut working = collect(&mut inner.working.iter());
        // Id as tie-break: same-instant submissions must still order stably.
        working.sort_by_key(|info| (info.created_at, info.id));
        let finished = collect(&mut inner.finished.iter());

        SchedulerSnapshot {
            ready,
            working,
            finished,
        }
    }

    /// Current bookkeeping for one task, if it was ever submitted
    pub fn task_info(&self, task_id: TaskId) -> Option<TaskInfo> {
        let inner = self.inner.lock().unwrap();
        inner.tasks.get(&task_id).map(|r| r.info.clone())
    }

    /// Number of currently working tasks
    pub fn working_count(&self) -> usize {
        self.inner.lock().unwrap().working.len()
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("TaskScheduler")
            .field("max_concurrent", &inner.config.max_concurrent)
            .field("ready", &inner.ready.len())
            .field("working", &inner.working.len())
            .field("finished", &inner.finished.len())
            .finish()
    }
}

/// Fill admission slots from the ready queue, FIFO.
///
/// Slots are claimed under the caller's lock; the returned executors are
/// started only after the lock is released, so a completion arriving from a
/// fast executor re-enters through the pump without double-admitting.
fn admit(inner: &mut SchedulerInner) -> Vec<(Arc<dyn Executor>, Reporter)> {
    let mut starts = Vec::new();
    while inner.working.len() < inner.config.max_concurrent {
        let Some(task_id) = inner.ready.pop_front() else {
            break;
        };
        let newly_admitted = inner.working.insert(task_id);
        debug_assert!(newly_admitted, "task {task_id} admitted twice");

        let Some(record) = inner.tasks.get_mut(&task_id) else {
            debug_assert!(false, "ready queue referenced unknown task {task_id}");
            continue;
        };
        record.info.state = TaskState::Ready;
        let executor = record.executor.clone();

        debug!(task = %task_id, working = inner.working.len(), "task admitted");
        let event = SchedulerEvent::Task {
            task_id,
            state: TaskState::Ready,
        };
        inner.subscriptions.notify_task(task_id, None, &event);

        let reporter = Reporter::new(task_id, inner.report_tx.clone());
        starts.push((executor, reporter));
    }
    // Working may already exceed the cap after a decrease (no preemption);
    // the invariant is only that admission itself never pushes past the cap.
    debug_assert!(
        starts.is_empty() || inner.working.len() <= inner.config.max_concurrent,
        "admission exceeded max_concurrent"
    );
    starts
}

fn start_all(starts: Vec<(Arc<dyn Executor>, Reporter)>) {
    for (executor, reporter) in starts {
        executor.start(reporter);
    }
}

/// Apply one executor report; returns newly admitted work.
fn apply_report(inner: &mut SchedulerInner, report: Report) -> Vec<(Arc<dyn Executor>, Reporter)> {
    match report {
        Report::Progress { task_id, progress } => {
            if !inner.working.contains(&task_id) {
                warn!(task = %task_id, "progress report for task not in working set, dropped");
                return Vec::new();
            }
            let Some(record) = inner.tasks.get_mut(&task_id) else {
                debug_assert!(false, "working set referenced unknown task {task_id}");
                return Vec::new();
            };
            record.info.state = TaskState::Working(progress);
            let group = if inner.config.notify_group_on_progress {
                record.info.group_id.clone()
            } else {
                None
            };
            let event = SchedulerEvent::Task {
                task_id,
                state: TaskState::Working(progress),
            };
            inner.subscriptions.notify_task(task_id, group.as_ref(), &event);
            Vec::new()
        }
        Report::Finished { task_id, outcome } => {
            if !inner.working.remove(&task_id) {
                warn!(task = %task_id, "terminal report for task not in working set, dropped");
                return Vec::new();
            }
            let Some(record) = inner.tasks.get_mut(&task_id) else {
                debug_assert!(false, "working set referenced unknown task {task_id}");
                return Vec::new();
            };

            let success = outcome.is_ok();
            let state = match outcome {
                Ok(()) => TaskState::Success,
                Err(error) => TaskState::Failure(error),
            };
            record.info.state = state.clone();
            let group_id = record.info.group_id.clone();
            inner.finished.push(task_id);
            debug!(task = %task_id, state = %state, "task finished");

            let event = SchedulerEvent::Task { task_id, state };
            inner.subscriptions.notify_task(task_id, None, &event);

            if let Some(group_id) = group_id {
                if let Some(tally) = inner.groups.resolve_one(&group_id, success) {
                    debug!(
                        group = %group_id,
                        success = tally.success_count,
                        failure = tally.failure_count,
                        "group resolved"
                    );
                    let event = SchedulerEvent::Group {
                        group_id: group_id.clone(),
                        success_count: tally.success_count,
                        failure_count: tally.failure_count,
                    };
                    inner.subscriptions.notify_group(&group_id, &event);
                }
            }

            admit(inner)
        }
    }
}

/// Report pump: single consumer serializing every state transition.
///
/// Holds only a weak reference to the scheduler; when every handle is
/// dropped and the last reporter is gone, the channel closes and the pump
/// ends.
async fn run_reports(inner: Weak<Mutex<SchedulerInner>>, mut rx: mpsc::UnboundedReceiver<Report>) {
    while let Some(report) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let starts = apply_report(&mut inner.lock().unwrap(), report);
        start_all(starts);
    }
}
