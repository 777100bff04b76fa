//! Deferred host work: watcher delivery and render commits.
//!
//! Jobs are keyed, so queuing the same job twice before a flush runs it once.
//! A flush runs jobs in key order, which puts parents before children and an
//! instance's watchers before its render.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::Rc,
};

use crate::instance::InstanceId;

/// Upper bound on flush rounds; jobs that keep re-queuing each other past this
/// are dropped.
const MAX_FLUSH_ROUNDS: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum JobKind {
    Watch(usize),
    Render,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct JobKey {
    pub(crate) instance: InstanceId,
    pub(crate) kind: JobKind,
}

type Job = Rc<dyn Fn()>;

#[derive(Default)]
pub(crate) struct Scheduler {
    queue: RefCell<BTreeMap<JobKey, Job>>,
    flushing: Cell<bool>,
}

impl Scheduler {
    pub(crate) fn queue(&self, key: JobKey, job: Job) {
        self.queue.borrow_mut().insert(key, job);
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Runs queued jobs until none are left. Jobs queued while flushing run in a
    /// later round of the same flush.
    pub(crate) fn flush(&self) {
        if self.flushing.replace(true) {
            return;
        }

        let mut rounds = 0;
        loop {
            let jobs = std::mem::take(&mut *self.queue.borrow_mut());
            if jobs.is_empty() {
                break;
            }
            rounds += 1;
            if rounds > MAX_FLUSH_ROUNDS {
                tracing::error!(
                    dropped = jobs.len(),
                    "possible infinite update loop, dropping queued jobs"
                );
                self.queue.borrow_mut().clear();
                break;
            }
            for job in jobs.into_values() {
                ferry_reactive::untrack(|| job());
            }
        }

        self.flushing.set(false);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn key(instance: u64, kind: JobKind) -> JobKey {
        JobKey {
            instance: InstanceId(instance),
            kind,
        }
    }

    #[test]
    fn jobs_run_once_in_key_order() {
        let scheduler = Scheduler::default();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (instance, kind, label) in [
            (2, JobKind::Render, "child render"),
            (1, JobKind::Render, "parent render"),
            (1, JobKind::Watch(0), "parent watch"),
            (1, JobKind::Render, "parent render"),
        ] {
            let log = log.clone();
            scheduler.queue(key(instance, kind), Rc::new(move || log.borrow_mut().push(label)));
        }
        assert_eq!(scheduler.pending(), 3);

        scheduler.flush();
        assert_eq!(
            *log.borrow(),
            ["parent watch", "parent render", "child render"]
        );
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn jobs_queued_during_flush_run_in_the_same_flush() {
        let scheduler = Rc::new(Scheduler::default());
        let runs = Rc::new(Cell::new(0));

        let inner = {
            let runs = runs.clone();
            Rc::new(move || runs.set(runs.get() + 1)) as Job
        };
        let outer = {
            let scheduler = scheduler.clone();
            let runs = runs.clone();
            Rc::new(move || {
                runs.set(runs.get() + 1);
                scheduler.queue(key(1, JobKind::Render), inner.clone());
            }) as Job
        };
        scheduler.queue(key(2, JobKind::Render), outer);

        scheduler.flush();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn runaway_jobs_are_dropped() {
        let scheduler = Rc::new(Scheduler::default());
        let runs = Rc::new(Cell::new(0));

        fn requeue(scheduler: Rc<Scheduler>, runs: Rc<Cell<usize>>) {
            let job = {
                let scheduler = scheduler.clone();
                let runs = runs.clone();
                Rc::new(move || {
                    runs.set(runs.get() + 1);
                    requeue(scheduler.clone(), runs.clone());
                }) as Job
            };
            scheduler.queue(key(1, JobKind::Render), job);
        }
        requeue(scheduler.clone(), runs.clone());

        scheduler.flush();
        assert_eq!(runs.get(), MAX_FLUSH_ROUNDS);
        assert_eq!(scheduler.pending(), 0);
    }
}
