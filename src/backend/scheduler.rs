//! Timer seam for the controller's two self-rescheduling tasks.

use std::time::Duration;

use tokio::time::Instant;

/// Recurring work the controller schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Start the next periodic scan.
    Scan,
    /// Re-derive the current network from the driver and the scan list.
    RefreshCurrentNetwork,
}

impl Task {
    const ALL: [Task; 2] = [Task::Scan, Task::RefreshCurrentNetwork];

    fn slot(self) -> usize {
        match self {
            Task::Scan => 0,
            Task::RefreshCurrentNetwork => 1,
        }
    }
}

/// Single-shot timers, one per [`Task`]. When a timer fires the host calls
/// [`crate::backend::Controller::on_timer`].
pub trait Scheduler {
    /// Arm `task` to fire after `delay`. Arming an armed task is a no-op.
    fn schedule_after(&mut self, task: Task, delay: Duration);

    fn cancel(&mut self, task: Task);

    fn is_scheduled(&self, task: Task) -> bool;
}

/// [`Scheduler`] as a deadline table polled by the event loop.
#[derive(Debug, Default)]
pub struct DeadlineScheduler {
    deadlines: [Option<Instant>; 2],
}

impl DeadlineScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Earliest armed deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().flatten().min().copied()
    }

    /// Disarms and returns the first task due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<Task> {
        let task = Task::ALL
            .into_iter()
            .filter(|t| self.deadlines[t.slot()].is_some_and(|d| d <= now))
            .min_by_key(|t| self.deadlines[t.slot()])?;
        self.deadlines[task.slot()] = None;
        Some(task)
    }

    pub(crate) fn schedule_at(&mut self, task: Task, deadline: Instant) {
        let slot = &mut self.deadlines[task.slot()];
        if slot.is_none() {
            *slot = Some(deadline);
        }
    }
}

impl Scheduler for DeadlineScheduler {
    fn schedule_after(&mut self, task: Task, delay: Duration) {
        self.schedule_at(task, Instant::now() + delay);
    }

    fn cancel(&mut self, task: Task) {
        self.deadlines[task.slot()] = None;
    }

    fn is_scheduled(&self, task: Task) -> bool {
        self.deadlines[task.slot()].is_some()
    }
}
