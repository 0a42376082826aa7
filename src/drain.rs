//! Per-thread queue of handlers waiting to run after a settlement.
//!
//! The first settlement on a thread owns the queue and runs jobs until it is
//! empty. Settlements made by those jobs only append to it, so settling a
//! long chain of promises takes constant stack depth.
use log::warn;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

pub(crate) type Job = Box<dyn FnOnce()>;

type Queue = RefCell<Option<VecDeque<Job>>>;

thread_local!(static QUEUE: Queue = RefCell::new(None));

/// Runs `jobs` in order before returning, unless a drain is already running
/// on this thread, in which case they are queued behind it.
///
/// A panicking job does not stop the jobs after it. The first panic is
/// resumed once the queue is empty.
pub(crate) fn run<I>(jobs: I)
where
    I: IntoIterator<Item = Job>,
{
    let nested = QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        match queue.as_mut() {
            Some(pending) => {
                pending.extend(jobs);
                true
            }
            None => {
                *queue = Some(jobs.into_iter().collect());
                false
            }
        }
    });
    if nested {
        return;
    }

    let mut panicked = None;
    while let Some(job) = next() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            warn!("promise handler panicked, draining the remaining handlers");
            panicked.get_or_insert(payload);
        }
    }
    QUEUE.with(|queue| *queue.borrow_mut() = None);

    if let Some(payload) = panicked {
        panic::resume_unwind(payload);
    }
}

fn next() -> Option<Job> {
    QUEUE.with(|queue| queue.borrow_mut().as_mut().and_then(VecDeque::pop_front))
}

#[cfg(test)]
mod tests {
    use super::{run, Job};
    use std::cell::RefCell;
    use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
    use std::rc::Rc;

    fn job(f: impl FnOnce() + 'static) -> Job {
        Box::new(f)
    }

    #[test]
    fn test_nested_jobs_run_after_current_ones() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let (a, b, c) = (order.clone(), order.clone(), order.clone());
        run([
            job(move || {
                a.borrow_mut().push("a");
                let c = c.clone();
                run([job(move || c.borrow_mut().push("c"))]);
            }),
            job(move || b.borrow_mut().push("b")),
        ]);
        assert_eq!(*order.borrow(), ["a", "b", "c"]);
    }

    #[test]
    fn test_panic_does_not_skip_later_jobs() {
        let hits = Rc::new(RefCell::new(0));
        let counted = hits.clone();
        let result = catch_unwind(AssertUnwindSafe(|| {
            run([
                job(|| resume_unwind(Box::new("handler panic"))),
                job(move || *counted.borrow_mut() += 1),
            ])
        }));
        assert!(result.is_err());
        assert_eq!(*hits.borrow(), 1);

        // The queue is released, so the next drain runs normally.
        let again = hits.clone();
        run([job(move || *again.borrow_mut() += 1)]);
        assert_eq!(*hits.borrow(), 2);
    }
}
