use std::{cell::Cell, rc::Rc};

use crate::{Promise, Value};

/// Where a promise is in its lifecycle. Leaves `Pending` at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum State {
    #[default]
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

impl State {
    pub fn is_pending(&self) -> bool {
        matches!(self, State::Pending)
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, State::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, State::Rejected(_))
    }

    /// The settled value or reason, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            State::Pending => None,
            State::Fulfilled(v) | State::Rejected(v) => Some(v),
        }
    }
}

/// One flag shared by a resolve/reject pair. Whichever handle claims it
/// first wins; every later call of either handle is ignored.
#[derive(Debug, Clone, Default)]
pub(crate) struct OnceGuard(Rc<Cell<bool>>);

impl OnceGuard {
    /// Set the flag. Returns `true` only for the first caller.
    fn claim(&self) -> bool {
        !self.0.replace(true)
    }

    pub(crate) fn fired(&self) -> bool {
        self.0.get()
    }
}

/// The resolve half of a [`ResolvingFunctions`] pair.
///
/// Resolving runs the value through resolution, so resolving with another
/// promise or a thenable adopts its eventual outcome.
#[derive(Debug, Clone)]
pub struct Resolve {
    promise: Promise,
    guard: OnceGuard,
}

impl Resolve {
    pub fn call(&self, value: impl Into<Value>) {
        if self.guard.claim() {
            self.promise.resolve_with(value.into());
        } else {
            tracing::trace!(promise = self.promise.id(), "resolve ignored, already called");
        }
    }
}

/// The reject half of a [`ResolvingFunctions`] pair.
#[derive(Debug, Clone)]
pub struct Reject {
    promise: Promise,
    guard: OnceGuard,
}

impl Reject {
    pub fn call(&self, reason: impl Into<Value>) {
        if self.guard.claim() {
            self.promise.reject_with(reason.into());
        } else {
            tracing::trace!(promise = self.promise.id(), "reject ignored, already called");
        }
    }
}

/// A resolve/reject pair for one promise, sharing one [`OnceGuard`].
///
/// The guard is created here, before either handle can be handed out, so a
/// re-entrant call from inside an executor or a thenable is already covered.
pub(crate) struct ResolvingFunctions {
    pub(crate) resolve: Resolve,
    pub(crate) reject: Reject,
    pub(crate) guard: OnceGuard,
}

impl ResolvingFunctions {
    pub(crate) fn new(promise: &Promise) -> Self {
        let guard = OnceGuard::default();
        Self {
            resolve: Resolve {
                promise: promise.clone(),
                guard: guard.clone(),
            },
            reject: Reject {
                promise: promise.clone(),
                guard: guard.clone(),
            },
            guard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OnceGuard, ResolvingFunctions, State};
    use crate::{JobQueue, Promise, Value};

    #[test]
    fn test_guard_claims_once() {
        let guard = OnceGuard::default();
        assert!(!guard.fired());
        assert!(guard.claim());
        assert!(guard.fired());
        assert!(!guard.clone().claim());
    }

    #[test]
    fn test_first_handle_wins() {
        let jobs = JobQueue::new();
        let promise = Promise::pending(&jobs);
        let fns = ResolvingFunctions::new(&promise);
        fns.reject.call("first");
        fns.resolve.call("second");
        fns.reject.call("third");
        assert!(fns.guard.fired());
        assert_eq!(promise.state(), State::Rejected(Value::from("first")));
    }

    #[test]
    fn test_state_accessors() {
        assert!(State::default().is_pending());
        assert_eq!(State::Pending.value(), None);
        let done = State::Fulfilled(Value::from(1));
        assert!(done.is_fulfilled());
        assert!(!done.is_rejected());
        assert_eq!(done.value(), Some(&Value::from(1)));
    }
}
