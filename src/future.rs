use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{Promise, State, Value};

/// Awaiting a promise yields `Ok(value)` or `Err(reason)`.
///
/// Awaiting does not register a continuation, it only parks the task until
/// settlement. The promise settles only while somebody drains its
/// [`JobQueue`](crate::JobQueue), so run the queue next to the executor.
///
/// # Examples
///
/// ```
/// use promise_out::{Deferred, JobQueue, Value};
/// use futures::{executor::LocalPool, task::LocalSpawnExt};
///
/// let jobs = JobQueue::new();
/// let deferred = Deferred::new(&jobs);
/// let promise = deferred.promise();
///
/// let mut pool = LocalPool::new();
/// let handle = pool
///     .spawner()
///     .spawn_local_with_handle(async move { promise.await })
///     .unwrap();
///
/// pool.run_until_stalled();
/// deferred.resolve("🍓");
/// jobs.run_until_idle();
/// assert_eq!(pool.run_until(handle), Ok(Value::from("🍓")));
/// ```
impl Future for Promise {
    type Output = Result<Value, Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.inner.borrow_mut();
        match inner.state {
            State::Fulfilled(ref value) => Poll::Ready(Ok(value.clone())),
            State::Rejected(ref reason) => Poll::Ready(Err(reason.clone())),
            State::Pending => {
                // Several tasks may await clones of one promise.
                if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    inner.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}
