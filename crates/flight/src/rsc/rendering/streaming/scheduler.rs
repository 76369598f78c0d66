use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

pub type Work = Box<dyn FnOnce()>;

/// Runs work later on the host's cooperative scheduler.
pub trait Scheduler {
    fn schedule_work(&self, work: Work);
}

/// Queues work until the caller runs it. Used by tests and hosts that drive ticks themselves.
#[derive(Default)]
pub struct ManualScheduler {
    queue: RefCell<VecDeque<Work>>,
    scheduled: Cell<usize>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the oldest queued work item. Returns false when nothing was queued.
    pub fn run_next(&self) -> bool {
        let work = self.queue.borrow_mut().pop_front();
        match work {
            Some(work) => {
                work();
                true
            }
            None => false,
        }
    }

    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    /// Total number of `schedule_work` calls received.
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.get()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_work(&self, work: Work) {
        self.scheduled.set(self.scheduled.get() + 1);
        self.queue.borrow_mut().push_back(work);
    }
}

/// Spawns each work item as a task on the current `LocalSet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTaskScheduler;

impl Scheduler for LocalTaskScheduler {
    fn schedule_work(&self, work: Work) {
        tokio::task::spawn_local(async move { work() });
    }
}
