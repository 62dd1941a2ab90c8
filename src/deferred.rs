use crate::{state::ResolvingFunctions, JobQueue, Promise, Reject, Resolve, Value};

/// A promise together with the handles that settle it from outside.
///
/// # Examples
///
/// ```
/// use promise_out::{callback, Deferred, JobQueue, State, Value};
///
/// let jobs = JobQueue::new();
/// let deferred = Deferred::new(&jobs);
/// let length = deferred
///     .promise()
///     .catch(callback(|e| Ok(Value::from(e.as_str().map_or(0, str::len)))));
///
/// deferred.reject("💥");
/// deferred.resolve("ignored, already rejected");
/// jobs.run_until_idle();
/// assert_eq!(length.state(), State::Fulfilled(Value::from(4)));
/// ```
#[derive(Debug, Clone)]
pub struct Deferred {
    promise: Promise,
    resolve: Resolve,
    reject: Reject,
}

impl Deferred {
    pub fn new(jobs: &JobQueue) -> Self {
        let promise = Promise::pending(jobs);
        let fns = ResolvingFunctions::new(&promise);
        Self {
            promise,
            resolve: fns.resolve,
            reject: fns.reject,
        }
    }

    pub fn promise(&self) -> Promise {
        self.promise.clone()
    }

    pub fn resolve(&self, value: impl Into<Value>) {
        self.resolve.call(value)
    }

    pub fn reject(&self, reason: impl Into<Value>) {
        self.reject.call(reason)
    }

    pub fn into_parts(self) -> (Promise, Resolve, Reject) {
        (self.promise, self.resolve, self.reject)
    }
}
