//! Registered continuations and their delivery.
use std::{fmt, mem};

use crate::{Promise, State, Value};

/// A continuation passed to [`Promise::then`].
///
/// `Ok` fulfils the derived promise (after resolution, so returning a promise
/// or thenable adopts it). `Err` rejects it.
pub struct Callback(Box<dyn FnOnce(Value) -> Result<Value, Value>>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Value) -> Result<Value, Value> + 'static,
    {
        Callback(Box::new(f))
    }

    fn call(self, value: Value) -> Result<Value, Value> {
        (self.0)(value)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

/// Shorthand for `Some(Callback::new(f))`.
pub fn callback<F>(f: F) -> Option<Callback>
where
    F: FnOnce(Value) -> Result<Value, Value> + 'static,
{
    Some(Callback::new(f))
}

/// One `then` registration. `derived` is settled from whichever slot matches
/// the parent's outcome.
#[derive(Debug)]
pub(crate) struct Reaction {
    pub(crate) on_fulfilled: Option<Callback>,
    pub(crate) on_rejected: Option<Callback>,
    pub(crate) derived: Promise,
}

#[derive(Debug, Default)]
pub(crate) struct Ledger {
    reactions: Vec<Reaction>,
}

impl Ledger {
    pub(crate) fn push(&mut self, reaction: Reaction) {
        self.reactions.push(reaction);
    }

    /// Hand over every registration so far, leaving a fresh ledger behind.
    pub(crate) fn take(&mut self) -> Vec<Reaction> {
        mem::take(&mut self.reactions)
    }

    pub(crate) fn len(&self) -> usize {
        self.reactions.len()
    }
}

/// Run `reactions` against a settled `state`, in registration order.
pub(crate) fn deliver(reactions: Vec<Reaction>, state: &State) {
    let (value, fulfilled) = match state {
        State::Fulfilled(v) => (v, true),
        State::Rejected(v) => (v, false),
        State::Pending => return,
    };

    for reaction in reactions {
        let slot = if fulfilled {
            reaction.on_fulfilled
        } else {
            reaction.on_rejected
        };
        let outcome = match slot {
            Some(callback) => callback.call(value.clone()),
            None if fulfilled => Ok(value.clone()),
            None => Err(value.clone()),
        };
        match outcome {
            Ok(v) => reaction.derived.resolve_with(v),
            Err(reason) => {
                tracing::debug!(
                    promise = reaction.derived.id(),
                    ?reason,
                    "continuation rejected derived promise"
                );
                reaction.derived.reject_with(reason)
            }
        }
    }
}
