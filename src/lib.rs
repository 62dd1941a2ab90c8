//! promiseOut for rust: single-threaded Promises/A+ promises.
//!
//! A [`Promise`] starts pending and settles exactly once, to a fulfilment
//! value or a rejection reason. Continuations registered with
//! [`Promise::then`] run exactly once, in registration order, and never
//! before the call that registered them returns: every delivery goes through
//! a [`JobQueue`] that the embedder drains.
//!
//! Resolving a promise with another promise, or with a foreign [`Thenable`],
//! adopts that value's eventual outcome.
//!
//! # Examples
//!
//! ```
//! use promise_out::{callback, JobQueue, Promise, State, Value};
//!
//! let jobs = JobQueue::new();
//! let failed = Promise::new(&jobs, |_resolve, reject| {
//!     reject.call("boom");
//!     Ok(())
//! });
//! let length = failed.then(
//!     None,
//!     callback(|e| Ok(Value::from(e.as_str().map_or(0, str::len)))),
//! );
//! jobs.run_until_idle();
//! assert_eq!(length.state(), State::Fulfilled(Value::from(4)));
//! ```
pub mod deferred;
mod future;
mod ledger;
pub mod promise;
mod resolution;
pub mod scheduler;
mod state;
pub mod thenable;
mod value;

pub use deferred::Deferred;
pub use ledger::{callback, Callback};
pub use promise::Promise;
pub use scheduler::{JobQueue, QueueConfig, RunReport};
pub use state::{Reject, Resolve, State};
pub use thenable::{PlainObject, ThenFn, Thenable, ThenableFn};
pub use value::Value;

/// Rejection reasons produced by this crate, or built by callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("TypeError: chaining cycle detected for promise")]
    SelfResolution,
    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Custom(message.into())
    }
}
