//! The promise itself: construction, the exactly-once state machine and
//! `then` chaining.
use std::{
    cell::RefCell,
    fmt, mem,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
    task::Waker,
};

use crate::{
    ledger::{self, Callback, Ledger, Reaction},
    resolution,
    state::ResolvingFunctions,
    JobQueue, Reject, Resolve, State, Value,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A single-threaded Promises/A+ promise.
///
/// Cloning gives another handle to the same promise.
///
/// # Examples
///
/// ```
/// use promise_out::{callback, JobQueue, Promise, State, Value};
///
/// let jobs = JobQueue::new();
/// let promise = Promise::new(&jobs, |resolve, _reject| {
///     resolve.call(5);
///     Ok(())
/// });
/// let doubled = promise.then(
///     callback(|v| Ok(Value::from(v.as_number().unwrap_or(0.0) * 2.0))),
///     None,
/// );
/// jobs.run_until_idle();
/// assert_eq!(doubled.state(), State::Fulfilled(Value::from(10)));
/// ```
#[derive(Clone)]
pub struct Promise {
    pub(crate) inner: Rc<RefCell<Inner>>,
}

pub(crate) struct Inner {
    id: u64,
    pub(crate) state: State,
    ledger: Ledger,
    pub(crate) wakers: Vec<Waker>,
    jobs: JobQueue,
}

impl Promise {
    /// Create a promise and run `executor` synchronously with its resolving
    /// handles.
    ///
    /// An `Err` from the executor rejects the promise, unless one of the
    /// handles was already called.
    pub fn new<F>(jobs: &JobQueue, executor: F) -> Self
    where
        F: FnOnce(Resolve, Reject) -> Result<(), Value>,
    {
        let promise = Self::pending(jobs);
        let fns = ResolvingFunctions::new(&promise);
        if let Err(reason) = executor(fns.resolve, fns.reject.clone()) {
            if fns.guard.fired() {
                tracing::debug!(
                    promise = promise.id(),
                    ?reason,
                    "executor failed after settling, ignored"
                );
            } else {
                fns.reject.call(reason);
            }
        }
        promise
    }

    /// A promise nobody can settle except through resolution plumbing.
    pub fn pending(jobs: &JobQueue) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(promise = id, "promise created");
        Self {
            inner: Rc::new(RefCell::new(Inner {
                id,
                state: State::Pending,
                ledger: Ledger::default(),
                wakers: vec![],
                jobs: jobs.clone(),
            })),
        }
    }

    /// A promise resolved with `value`. Promises and thenables are adopted.
    pub fn resolved(jobs: &JobQueue, value: impl Into<Value>) -> Self {
        let promise = Self::pending(jobs);
        promise.resolve_with(value.into());
        promise
    }

    pub fn rejected(jobs: &JobQueue, reason: impl Into<Value>) -> Self {
        let promise = Self::pending(jobs);
        promise.reject_with(reason.into());
        promise
    }

    /// Register continuations and get the promise they will settle.
    ///
    /// Neither continuation runs before this call returns, even when the
    /// promise is already settled. A missing slot passes the outcome through
    /// unchanged.
    pub fn then(&self, on_fulfilled: Option<Callback>, on_rejected: Option<Callback>) -> Promise {
        let (derived, settled) = {
            let mut inner = self.inner.borrow_mut();
            let derived = Promise::pending(&inner.jobs);
            inner.ledger.push(Reaction {
                on_fulfilled,
                on_rejected,
                derived: derived.clone(),
            });
            tracing::trace!(
                promise = inner.id,
                derived = derived.id(),
                reactions = inner.ledger.len(),
                "continuation registered"
            );
            (derived, !inner.state.is_pending())
        };
        if settled {
            self.schedule_flush();
        }
        derived
    }

    /// `then(None, on_rejected)`.
    pub fn catch(&self, on_rejected: Option<Callback>) -> Promise {
        self.then(None, on_rejected)
    }

    pub fn state(&self) -> State {
        self.inner.borrow().state.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.borrow().state.is_pending()
    }

    pub fn id(&self) -> u64 {
        self.inner.borrow().id
    }

    pub fn jobs(&self) -> JobQueue {
        self.inner.borrow().jobs.clone()
    }

    /// Whether both handles point at the same promise.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Offer `value` as the settlement. No-op unless pending.
    pub(crate) fn resolve_with(&self, value: Value) {
        if self.is_pending() {
            resolution::resolve_promise(self, value);
        }
    }

    /// Reject with `reason`. No-op unless pending.
    pub(crate) fn reject_with(&self, reason: Value) {
        self.settle(State::Rejected(reason));
    }

    /// Move a pending promise to `outcome`, wake awaiters and schedule a
    /// flush. Returns `false` if the promise had already settled.
    pub(crate) fn settle(&self, outcome: State) -> bool {
        if outcome.is_pending() {
            return false;
        }
        let wakers = {
            let mut inner = self.inner.borrow_mut();
            if !inner.state.is_pending() {
                return false;
            }
            tracing::trace!(promise = inner.id, state = ?outcome, "promise settled");
            inner.state = outcome;
            mem::take(&mut inner.wakers)
        };
        for waker in wakers {
            waker.wake();
        }
        self.schedule_flush();
        true
    }

    fn schedule_flush(&self) {
        let jobs = self.jobs();
        let promise = self.clone();
        jobs.enqueue(move || promise.flush());
    }

    /// Deliver every registration made so far. Registrations made while
    /// delivering land in a fresh ledger and get their own flush.
    fn flush(&self) {
        let (state, reactions) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state.is_pending() {
                return;
            }
            (inner.state.clone(), inner.ledger.take())
        };
        if reactions.is_empty() {
            return;
        }
        tracing::trace!(promise = self.id(), reactions = reactions.len(), "flushing");
        ledger::deliver(reactions, &state);
    }
}

/// Pending promises own their derived promises through the ledger, so a long
/// unsettled chain would otherwise drop one nested level per stack frame.
impl Drop for Inner {
    fn drop(&mut self) {
        let mut orphans = self.ledger.take();
        while let Some(Reaction { derived, .. }) = orphans.pop() {
            if let Ok(cell) = Rc::try_unwrap(derived.inner) {
                orphans.append(&mut cell.into_inner().ledger.take());
            }
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Promise")
                .field("id", &inner.id)
                .field("state", &inner.state)
                .finish(),
            Err(_) => f.debug_struct("Promise").finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Promise;
    use crate::{callback, Error, JobQueue, State, Value};
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn test_executor_runs_synchronously() {
        let jobs = JobQueue::new();
        let ran = Rc::new(RefCell::new(false));
        let flag = ran.clone();
        let promise = Promise::new(&jobs, move |_, _| {
            *flag.borrow_mut() = true;
            Ok(())
        });
        assert!(*ran.borrow());
        assert!(promise.is_pending());
    }

    #[test]
    fn test_executor_error_rejects() {
        let jobs = JobQueue::new();
        let promise = Promise::new(&jobs, |_, _| Err(Error::msg("bad executor").into()));
        assert_eq!(
            promise.state(),
            State::Rejected(Value::from(Error::msg("bad executor")))
        );
    }

    #[test]
    fn test_executor_error_after_resolve_is_ignored() {
        let jobs = JobQueue::new();
        let promise = Promise::new(&jobs, |resolve, _| {
            resolve.call(1);
            Err(Value::from("too late"))
        });
        assert_eq!(promise.state(), State::Fulfilled(Value::from(1)));
    }

    #[test]
    fn test_then_on_settled_promise_is_deferred() {
        let jobs = JobQueue::new();
        let promise = Promise::resolved(&jobs, "done");
        jobs.run_until_idle();
        let seen = Rc::new(RefCell::new(None));
        let slot = seen.clone();
        let derived = promise.then(
            callback(move |v| {
                *slot.borrow_mut() = Some(v.clone());
                Ok(v)
            }),
            None,
        );
        assert!(seen.borrow().is_none());
        assert!(derived.is_pending());
        jobs.run_until_idle();
        assert_eq!(*seen.borrow(), Some(Value::from("done")));
        assert_eq!(derived.state(), State::Fulfilled(Value::from("done")));
    }

    #[test]
    fn test_settle_only_once() {
        let jobs = JobQueue::new();
        let promise = Promise::pending(&jobs);
        assert!(promise.settle(State::Fulfilled(Value::from(1))));
        assert!(!promise.settle(State::Rejected(Value::from(2))));
        assert!(!promise.settle(State::Pending));
        promise.reject_with(Value::from(3));
        promise.resolve_with(Value::from(4));
        assert_eq!(promise.state(), State::Fulfilled(Value::from(1)));
    }

    #[test]
    fn test_derived_promises_share_queue_and_are_distinct() {
        let jobs = JobQueue::new();
        let promise = Promise::pending(&jobs);
        let a = promise.then(None, None);
        let b = promise.then(None, None);
        assert!(!a.ptr_eq(&b));
        assert!(!a.ptr_eq(&promise));
        assert_ne!(a.id(), b.id());
        promise.reject_with(Value::from("x"));
        a.jobs().run_until_idle();
        assert_eq!(a.state(), State::Rejected(Value::from("x")));
        assert_eq!(b.state(), State::Rejected(Value::from("x")));
    }

    #[test]
    fn test_catch_recovers() {
        let jobs = JobQueue::new();
        let recovered = Promise::rejected(&jobs, "boom").catch(callback(|e| {
            Ok(Value::from(e.as_str().map_or(0, str::len)))
        }));
        jobs.run_until_idle();
        assert_eq!(recovered.state(), State::Fulfilled(Value::from(4)));
    }

    #[test]
    fn test_dropping_long_pending_chain() {
        let jobs = JobQueue::new();
        let root = Promise::pending(&jobs);
        let mut tail = root.clone();
        for _ in 0..100_000 {
            tail = tail.then(callback(Ok), None);
        }
        drop(tail);
        drop(root);
        assert!(jobs.is_idle());
    }

    #[test]
    fn test_dropping_root_keeps_held_derived_alive() {
        let jobs = JobQueue::new();
        let root = Promise::pending(&jobs);
        let held = root.then(None, None);
        let downstream = held.then(None, None);
        drop(root);
        assert!(held.is_pending());
        assert!(downstream.is_pending());
        drop(held);
        assert!(downstream.is_pending());
    }

    #[test]
    fn test_debug_shows_id_and_state() {
        let jobs = JobQueue::new();
        let promise = Promise::resolved(&jobs, 1);
        let text = format!("{promise:?}");
        assert!(text.contains("Promise"));
        assert!(text.contains("Fulfilled"));
    }
}
