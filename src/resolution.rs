//! Deciding what a promise actually settles to when offered a value.
//!
//! Promises and thenables are unwrapped until a plain value comes out. The
//! unwrapping recurses through the resolving handles handed to them, so a
//! chain of any depth ends in a plain fulfilment or a rejection.
use crate::{callback, state::ResolvingFunctions, Error, Promise, State, Value};

/// Settle `promise` from the offered value `x`.
pub(crate) fn resolve_promise(promise: &Promise, x: Value) {
    match x {
        Value::Promise(ref other) if other.ptr_eq(promise) => {
            tracing::debug!(promise = promise.id(), "promise resolved with itself");
            promise.reject_with(Error::SelfResolution.into());
        }
        Value::Promise(other) => adopt(promise, &other),
        Value::Object(ref object) => match object.then_slot() {
            Err(reason) => {
                tracing::debug!(promise = promise.id(), ?reason, "reading then failed");
                promise.reject_with(reason);
            }
            Ok(Some(then)) => {
                let fns = ResolvingFunctions::new(promise);
                if let Err(reason) = then(&x, fns.resolve, fns.reject.clone()) {
                    if fns.guard.fired() {
                        tracing::debug!(
                            promise = promise.id(),
                            ?reason,
                            "then failed after settling, ignored"
                        );
                    } else {
                        tracing::debug!(promise = promise.id(), ?reason, "then failed");
                        fns.reject.call(reason);
                    }
                }
            }
            Ok(None) => {
                promise.settle(State::Fulfilled(x.clone()));
            }
        },
        x => {
            promise.settle(State::Fulfilled(x));
        }
    }
}

/// Make `promise` follow `other`.
fn adopt(promise: &Promise, other: &Promise) {
    match other.state() {
        State::Pending => {
            let fns = ResolvingFunctions::new(promise);
            let (resolve, reject) = (fns.resolve, fns.reject);
            // The derived promise is never observed.
            other.then(
                callback(move |value| {
                    resolve.call(value);
                    Ok(Value::Undefined)
                }),
                callback(move |reason| {
                    reject.call(reason);
                    Ok(Value::Undefined)
                }),
            );
            tracing::trace!(promise = promise.id(), adopting = other.id(), "waiting on promise");
        }
        settled => {
            promise.settle(settled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_promise;
    use crate::{Error, JobQueue, PlainObject, Promise, State, ThenableFn, Value};
    use std::{cell::Cell, rc::Rc};

    #[test]
    fn test_self_resolution_rejects() {
        let jobs = JobQueue::new();
        let promise = Promise::pending(&jobs);
        resolve_promise(&promise, Value::from(&promise));
        assert_eq!(
            promise.state(),
            State::Rejected(Value::from(Error::SelfResolution))
        );
    }

    #[test]
    fn test_plain_values_fulfil_immediately() {
        let jobs = JobQueue::new();
        let promise = Promise::pending(&jobs);
        resolve_promise(&promise, Value::Null);
        assert_eq!(promise.state(), State::Fulfilled(Value::Null));
    }

    #[test]
    fn test_object_without_then_is_a_plain_value() {
        let jobs = JobQueue::new();
        let object = Value::object(PlainObject);
        let promise = Promise::pending(&jobs);
        resolve_promise(&promise, object.clone());
        assert_eq!(promise.state(), State::Fulfilled(object));
    }

    #[test]
    fn test_settled_promise_state_is_copied() {
        let jobs = JobQueue::new();
        let settled = Promise::rejected(&jobs, "nope");
        let promise = Promise::pending(&jobs);
        resolve_promise(&promise, Value::from(&settled));
        assert_eq!(promise.state(), State::Rejected(Value::from("nope")));
    }

    #[test]
    fn test_pending_promise_is_followed() {
        let jobs = JobQueue::new();
        let inner = Promise::pending(&jobs);
        let promise = Promise::pending(&jobs);
        resolve_promise(&promise, Value::from(&inner));
        jobs.run_until_idle();
        assert!(promise.is_pending());
        inner.settle(State::Fulfilled(Value::from("x")));
        jobs.run_until_idle();
        assert_eq!(promise.state(), State::Fulfilled(Value::from("x")));
    }

    #[test]
    fn test_then_failure_after_resolve_is_ignored() {
        let jobs = JobQueue::new();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let thenable = ThenableFn::new(move |_, resolve, reject| {
            counter.set(counter.get() + 1);
            resolve.call(1);
            reject.call(2);
            resolve.call(3);
            Err(Value::from("late failure"))
        });
        let promise = Promise::pending(&jobs);
        resolve_promise(&promise, Value::object(thenable));
        assert_eq!(calls.get(), 1);
        assert_eq!(promise.state(), State::Fulfilled(Value::from(1)));
    }
}
