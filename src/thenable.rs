//! Interop with foreign promise-like objects.
//!
//! A thenable is any object whose `then` slot is callable with a resolve and
//! a reject handle. Thenables are untrusted: their slot may fail to read,
//! and their `then` may call both handles, call them many times, call them
//! late, or fail after calling one. Resolution copes with all of that.
use std::rc::Rc;

use crate::{Reject, Resolve, Value};

/// A callable `then` slot. The first argument is the object the slot was
/// read from.
pub type ThenFn = Rc<dyn Fn(&Value, Resolve, Reject) -> Result<(), Value>>;

/// An object or function offered as a settlement value.
pub trait Thenable {
    /// Read the `then` slot.
    ///
    /// `Ok(None)` means the object has no callable `then` and resolves like a
    /// plain value. `Err(reason)` means reading the slot itself failed. Read
    /// once per resolution.
    fn then_slot(&self) -> Result<Option<ThenFn>, Value>;
}

/// An object with no `then` slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainObject;

impl Thenable for PlainObject {
    fn then_slot(&self) -> Result<Option<ThenFn>, Value> {
        Ok(None)
    }
}

/// A thenable built from a closure.
///
/// # Examples
///
/// ```
/// use promise_out::{JobQueue, Promise, State, ThenableFn, Value};
///
/// let jobs = JobQueue::new();
/// let thenable = ThenableFn::new(|_this, resolve, _reject| {
///     resolve.call("from a thenable");
///     Ok(())
/// });
/// let promise = Promise::resolved(&jobs, Value::object(thenable));
/// jobs.run_until_idle();
/// assert_eq!(promise.state(), State::Fulfilled(Value::from("from a thenable")));
/// ```
pub struct ThenableFn {
    then: ThenFn,
}

impl ThenableFn {
    pub fn new<F>(then: F) -> Self
    where
        F: Fn(&Value, Resolve, Reject) -> Result<(), Value> + 'static,
    {
        Self {
            then: Rc::new(then),
        }
    }
}

impl Thenable for ThenableFn {
    fn then_slot(&self) -> Result<Option<ThenFn>, Value> {
        Ok(Some(self.then.clone()))
    }
}
