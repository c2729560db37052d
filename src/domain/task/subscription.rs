//! Subscription Registry
//!
//! Decouples "which task changed state" from "who wants to know". Observers
//! register an event channel plus the task and group ids they care about;
//! the scheduler pushes typed events through this registry.
//!
//! Weak-observer semantics: an observer that drops its [`Subscriber`] closes
//! its channel, and the registry silently removes it on the next delivery
//! attempt. A dead observer never causes an error and never blocks delivery
//! to the others.

use crate::domain::task::model::{GroupId, TaskId, TaskState};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Observer identifier
pub type ObserverId = Uuid;

/// Event delivered to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A task transitioned state
    Task {
        /// The task that changed
        task_id: TaskId,
        /// Its new state
        state: TaskState,
    },
    /// A group fully resolved; delivered exactly once per group
    Group {
        /// The resolved group
        group_id: GroupId,
        /// Members that reached `Success`
        success_count: usize,
        /// Members that reached `Failure`
        failure_count: usize,
    },
}

/// Receiving end of an observer's subscription
///
/// Obtained from [`TaskScheduler::subscriber`]; pass [`Subscriber::id`] to
/// the subscribe/unsubscribe calls to declare interest. Dropping the handle
/// ends the subscription.
///
/// [`TaskScheduler::subscriber`]: crate::domain::task::scheduler::TaskScheduler::subscriber
#[derive(Debug)]
pub struct Subscriber {
    id: ObserverId,
    rx: mpsc::UnboundedReceiver<SchedulerEvent>,
}

impl Subscriber {
    /// Observer identity to use in subscribe/unsubscribe calls
    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Await the next event; `None` once the scheduler is gone
    pub async fn recv(&mut self) -> Option<SchedulerEvent> {
        self.rx.recv().await
    }

    /// Non-blocking receive for already-delivered events
    pub fn try_recv(&mut self) -> Option<SchedulerEvent> {
        self.rx.try_recv().ok()
    }
}

#[derive(Debug)]
struct ObserverEntry {
    tx: mpsc::UnboundedSender<SchedulerEvent>,
    tasks: HashSet<TaskId>,
    groups: HashSet<GroupId>,
}

/// Observer bookkeeping: who is interested in which tasks and groups
#[derive(Debug, Default)]
pub(crate) struct SubscriptionRegistry {
    observers: HashMap<ObserverId, ObserverEntry>,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a new observer and hand back its receiving half.
    pub(crate) fn register(&mut self) -> Subscriber {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.insert(
            id,
            ObserverEntry {
                tx,
                tasks: HashSet::new(),
                groups: HashSet::new(),
            },
        );
        Subscriber { id, rx }
    }

    /// Idempotent: re-subscribing to the same task is a no-op.
    pub(crate) fn subscribe_task(&mut self, observer: ObserverId, task_id: TaskId) {
        if let Some(entry) = self.observers.get_mut(&observer) {
            entry.tasks.insert(task_id);
        }
    }

    pub(crate) fn subscribe_group(&mut self, observer: ObserverId, group_id: GroupId) {
        if let Some(entry) = self.observers.get_mut(&observer) {
            entry.groups.insert(group_id);
        }
    }

    pub(crate) fn unsubscribe_task(&mut self, observer: ObserverId, task_id: TaskId) {
        if let Some(entry) = self.observers.get_mut(&observer) {
            entry.tasks.remove(&task_id);
        }
    }

    pub(crate) fn unsubscribe_group(&mut self, observer: ObserverId, group_id: &GroupId) {
        if let Some(entry) = self.observers.get_mut(&observer) {
            entry.groups.remove(group_id);
        }
    }

    pub(crate) fn unsubscribe_all(&mut self, observer: ObserverId) {
        self.observers.remove(&observer);
    }

    /// Deliver a task event to observers interested in `task_id`.
    ///
    /// When `group` is given (group-progress forwarding enabled), observers
    /// interested in that group receive the event too; an observer matching
    /// both still gets a single delivery.
    pub(crate) fn notify_task(
        &mut self,
        task_id: TaskId,
        group: Option<&GroupId>,
        event: &SchedulerEvent,
    ) {
        self.deliver(event, |entry| {
            entry.tasks.contains(&task_id)
                || group.is_some_and(|group_id| entry.groups.contains(group_id))
        });
    }

    /// Deliver a group event to observers interested in `group_id`.
    pub(crate) fn notify_group(&mut self, group_id: &GroupId, event: &SchedulerEvent) {
        self.deliver(event, |entry| entry.groups.contains(group_id));
    }

    fn deliver(&mut self, event: &SchedulerEvent, interested: impl Fn(&ObserverEntry) -> bool) {
        let mut gone = Vec::new();
        for (id, entry) in &self.observers {
            if !interested(entry) {
                continue;
            }
            if entry.tx.send(event.clone()).is_err() {
                gone.push(*id);
            }
        }
        for id in gone {
            tracing::debug!(observer = %id, "dropping observer with closed channel");
            self.observers.remove(&id);
        }
    }

    #[cfg(test)]
    fn observer_count(&self) -> usize {
        self.observers.len()
    }
}
