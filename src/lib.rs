//! Write-once promises with chained continuations.
//!
//! A [`Promise`] starts out pending and settles exactly once, either
//! fulfilled with a value or rejected with a reason. Continuations
//! registered with [`Promise::then`] and friends run as soon as the promise
//! settles, or straight away if it already has. Each continuation produces a
//! new promise, so chains are built one link at a time, and a continuation
//! that returns another promise is flattened into the chain.
//!
//! Handlers run inline on whichever thread settles the promise, in the order
//! they were registered. There is no scheduler in this crate.
//!
//! # Examples
//!
//! ```
//! use thenable::{Promise, Resolution};
//! use futures::executor::block_on;
//! use std::thread;
//!
//! let promise = Promise::<i32, String>::new(|resolve, _reject| {
//!     thread::spawn(move || resolve.resolve(1));
//!     Ok(())
//! })
//! .then(|v| Ok(Resolution::Value(v + 1)));
//!
//! assert_eq!(block_on(promise), Ok(2));
//! ```
//!
//! Combinators compose many promises into one:
//!
//! ```
//! use thenable::{all, Promise};
//! use futures::executor::block_on;
//!
//! let joined = all(vec![
//!     Promise::<i32, ()>::resolve(1),
//!     Promise::resolve(2),
//! ]);
//! assert_eq!(block_on(joined), Ok(vec![1, 2]));
//! ```

mod awaitable;
pub mod combinators;
mod drain;
mod error;
pub mod promise;
mod resolver;
mod settled;

pub use combinators::{all, all_settled, any, race};
pub use error::AggregateError;
pub use promise::{Promise, Resolution};
pub use resolver::{Rejecter, Resolver};
pub use settled::{PromiseState, Settled};

/// Bound shared by fulfillment values and rejection reasons.
///
/// Settled values are cloned into every handler that observes them, and
/// handlers may run on any thread that settles the promise.
pub trait Payload: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Payload for T {}
