//! The deferred work queue every promise delivers its continuations through.
//!
//! Jobs run strictly after the synchronous code that enqueued them, in the
//! order they were enqueued. Nothing runs until somebody drains the queue.
use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt,
    num::NonZeroUsize,
    rc::Rc,
};

type Job = Box<dyn FnOnce()>;

/// Settings for a [`JobQueue`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueConfig {
    /// Upper bound on the jobs a single [`JobQueue::run_until_idle`] call
    /// runs. `None` drains until the queue is empty.
    pub max_jobs_per_run: Option<NonZeroUsize>,
}

impl QueueConfig {
    /// Bound each drain to `budget` jobs. A budget of 0 means unbounded,
    /// the same as the default.
    pub fn max_jobs_per_run(mut self, budget: usize) -> Self {
        self.max_jobs_per_run = NonZeroUsize::new(budget);
        self
    }
}

/// What a call to [`JobQueue::run_until_idle`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Jobs executed during this call.
    pub ran: usize,
    /// Jobs still queued when the call returned.
    pub remaining: usize,
}

impl RunReport {
    pub fn is_idle(&self) -> bool {
        self.remaining == 0
    }
}

/// A FIFO queue of deferred jobs, shared by cloning.
///
/// # Examples
///
/// ```
/// use promise_out::{callback, JobQueue, Promise, State, Value};
///
/// let jobs = JobQueue::new();
/// let doubled = Promise::resolved(&jobs, 21)
///     .then(callback(|v| Ok(Value::from(v.as_number().unwrap_or(0.0) * 2.0))), None);
///
/// // Nothing is delivered before the queue is drained.
/// assert!(doubled.is_pending());
/// jobs.run_until_idle();
/// assert_eq!(doubled.state(), State::Fulfilled(Value::from(42)));
/// ```
#[derive(Clone, Default)]
pub struct JobQueue {
    inner: Rc<RefCell<Inner>>,
}

#[derive(Default)]
struct Inner {
    jobs: VecDeque<Job>,
    config: QueueConfig,
    draining: bool,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: QueueConfig) -> Self {
        let queue = Self::default();
        queue.inner.borrow_mut().config = config;
        queue
    }

    pub fn config(&self) -> QueueConfig {
        self.inner.borrow().config.clone()
    }

    /// Queue `job` to run after everything already queued.
    pub(crate) fn enqueue(&self, job: impl FnOnce() + 'static) {
        let mut inner = self.inner.borrow_mut();
        inner.jobs.push_back(Box::new(job));
        tracing::trace!(queued = inner.jobs.len(), "job enqueued");
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same as [`JobQueue::is_empty`]; reads better next to `run_until_idle`.
    pub fn is_idle(&self) -> bool {
        self.is_empty()
    }

    /// Run the oldest queued job. Returns `false` if there was none.
    ///
    /// Like [`JobQueue::run_until_idle`], this does nothing when called from
    /// inside a running job.
    pub fn run_once(&self) -> bool {
        if !self.begin_drain() {
            return false;
        }
        let _reset = DrainGuard(self);
        self.run_next()
    }

    /// Mark the queue as draining. `false` if it already was.
    fn begin_drain(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        !std::mem::replace(&mut inner.draining, true)
    }

    fn run_next(&self) -> bool {
        // The borrow must end before the job runs: jobs enqueue more jobs.
        let job = self.inner.borrow_mut().jobs.pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Drain the queue, including jobs enqueued while draining.
    ///
    /// Stops early once the configured budget is spent. Calling this from
    /// inside a running job does nothing and returns an empty report; the
    /// outer drain picks the new jobs up.
    pub fn run_until_idle(&self) -> RunReport {
        if !self.begin_drain() {
            return RunReport {
                ran: 0,
                remaining: self.len(),
            };
        }
        let _reset = DrainGuard(self);
        let budget = self.inner.borrow().config.max_jobs_per_run;

        let mut ran = 0;
        while budget.map_or(true, |max| ran < max.get()) {
            if !self.run_next() {
                break;
            }
            ran += 1;
        }

        let remaining = self.len();
        if remaining > 0 {
            tracing::debug!(ran, remaining, "job budget exhausted");
        } else {
            tracing::trace!(ran, "job queue idle");
        }
        RunReport { ran, remaining }
    }
}

/// Clears the `draining` flag even if a job panics.
struct DrainGuard<'a>(&'a JobQueue);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.0.inner.try_borrow_mut() {
            inner.draining = false;
        }
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("JobQueue")
            .field("queued", &inner.jobs.len())
            .field("config", &inner.config)
            .field("draining", &inner.draining)
            .finish()
    }
}
