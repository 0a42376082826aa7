//! The promise state machine and its continuation protocol.
//!
//! A promise is a handle to shared state behind a mutex. The state is either
//! pending, with a queue of handlers waiting on it, or settled with a value
//! or a reason. Settling swaps the queue out under the lock and then runs
//! every queued handler with the lock released, so handlers are free to
//! register on, or settle, any promise including this one. Settlements made
//! from inside a handler queue their own handlers behind the running ones
//! instead of recursing, so chain depth does not grow the stack.
use crate::drain::{self, Job};
use crate::{Payload, PromiseState, Rejecter, Resolver, Settled};
use log::{debug, trace};
use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::Waker;

/// A value that is not available yet.
///
/// Cloning a `Promise` yields another handle to the same settlement, so any
/// number of consumers can chain off one producer.
///
/// Handlers run on the thread that settles the promise, before the settling
/// call returns. Handlers registered on one promise run in registration
/// order, with one exception: a handler registered from another thread while
/// the promise is being settled may run before the handlers already queued.
/// A panicking handler does not stop the others; its panic is resumed from
/// the settling call once they have all run.
///
/// # Examples
///
/// ```
/// use thenable::{Promise, PromiseState, Resolution};
///
/// let (promise, resolve, _reject) = Promise::<i32, String>::with_resolvers();
/// let doubled = promise.then(|v| Ok(Resolution::Value(v * 2)));
/// assert_eq!(doubled.state(), PromiseState::Pending);
///
/// resolve.resolve(21);
/// assert_eq!(doubled.peek().and_then(|s| s.value().copied()), Some(42));
/// ```
pub struct Promise<T, E> {
    inner: Arc<Mutex<State<T, E>>>,
}

/// What a continuation settles its derived promise with.
///
/// A plain value fulfills the derived promise directly. A promise defers it:
/// the derived promise adopts that promise's outcome once it settles, so
/// nested promises never show up as values further down the chain.
pub enum Resolution<T, E> {
    Value(T),
    Deferred(Promise<T, E>),
}

impl<T, E> From<Promise<T, E>> for Resolution<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Resolution::Deferred(promise)
    }
}

enum State<T, E> {
    Pending {
        handlers: Vec<Handler<T, E>>,
        wakers: Vec<Waker>,
    },
    Fulfilled(T),
    Rejected(E),
}

/// A continuation waiting on a promise: one branch per outcome, consumed by
/// whichever one runs.
struct Handler<T, E> {
    on_fulfilled: Box<dyn FnOnce(T) + Send>,
    on_rejected: Box<dyn FnOnce(E) + Send>,
}

impl<T, E> Handler<T, E> {
    fn new<F, R>(on_fulfilled: F, on_rejected: R) -> Self
    where
        F: FnOnce(T) + Send + 'static,
        R: FnOnce(E) + Send + 'static,
    {
        Self {
            on_fulfilled: Box::new(on_fulfilled),
            on_rejected: Box::new(on_rejected),
        }
    }

    fn invoke(self, outcome: Settled<T, E>) {
        match outcome {
            Settled::Fulfilled(value) => (self.on_fulfilled)(value),
            Settled::Rejected(reason) => (self.on_rejected)(reason),
        }
    }
}

impl<T: Payload, E: Payload> Promise<T, E> {
    /// Creates a promise and runs `executor` right away with its two
    /// settlement capabilities.
    ///
    /// The executor may settle the promise before returning, or move the
    /// capabilities elsewhere and settle it later. Returning `Err` rejects
    /// the promise with that error, unless it already settled.
    ///
    /// # Examples
    ///
    /// ```
    /// use thenable::{Promise, PromiseState};
    ///
    /// let failed = Promise::<i32, String>::new(|_resolve, _reject| {
    ///     let n: i32 = "nope".parse().map_err(|_| String::from("not a number"))?;
    ///     println!("{n}");
    ///     Ok(())
    /// });
    /// assert_eq!(failed.state(), PromiseState::Rejected);
    /// ```
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Resolver<T, E>, Rejecter<T, E>) -> Result<(), E>,
    {
        let promise = Self::pending();
        let resolver = Resolver::new(promise.clone());
        let rejecter = Rejecter::new(promise.clone());
        if let Err(reason) = executor(resolver, rejecter) {
            debug!("executor failed, rejecting promise");
            promise.settle(Settled::Rejected(reason));
        }
        promise
    }

    /// Creates a pending promise together with the capabilities that settle
    /// it, for code that settles it from outside an executor.
    pub fn with_resolvers() -> (Self, Resolver<T, E>, Rejecter<T, E>) {
        let promise = Self::pending();
        let resolver = Resolver::new(promise.clone());
        let rejecter = Rejecter::new(promise.clone());
        (promise, resolver, rejecter)
    }

    /// A promise with no way to settle it.
    pub fn pending() -> Self {
        Self {
            inner: Arc::new(Mutex::new(State::Pending {
                handlers: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    /// A promise already fulfilled with `value`.
    ///
    /// A promise passed here becomes the value as is; use
    /// [`flatten`](Promise::flatten) to adopt its outcome instead.
    pub fn resolve(value: T) -> Self {
        Self::new(|resolve, _| {
            resolve.resolve(value);
            Ok(())
        })
    }

    /// A promise already rejected with `reason`.
    pub fn reject(reason: E) -> Self {
        Self::new(|_, reject| {
            reject.reject(reason);
            Ok(())
        })
    }

    /// Settles the promise from a [`Resolution`]: a value fulfills it right
    /// away, a promise is adopted.
    pub fn from_resolution(resolution: Resolution<T, E>) -> Self {
        match resolution {
            Resolution::Value(value) => Self::resolve(value),
            Resolution::Deferred(promise) => promise,
        }
    }

    pub fn state(&self) -> PromiseState {
        match &*self.lock() {
            State::Pending { .. } => PromiseState::Pending,
            State::Fulfilled(_) => PromiseState::Fulfilled,
            State::Rejected(_) => PromiseState::Rejected,
        }
    }

    pub fn is_settled(&self) -> bool {
        !self.state().is_pending()
    }

    /// The outcome, if the promise has settled.
    pub fn peek(&self) -> Option<Settled<T, E>> {
        match &*self.lock() {
            State::Pending { .. } => None,
            State::Fulfilled(value) => Some(Settled::Fulfilled(value.clone())),
            State::Rejected(reason) => Some(Settled::Rejected(reason.clone())),
        }
    }

    /// Registers a continuation for each outcome and returns the promise
    /// settled by whichever one runs.
    ///
    /// Each branch returns the [`Resolution`] of the derived promise, or
    /// `Err` to reject it. Branches run once the promise settles, or
    /// immediately if it already has.
    pub fn then_both<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E>
    where
        U: Payload,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + Send + 'static,
        R: FnOnce(E) -> Result<Resolution<U, E>, E> + Send + 'static,
    {
        let (derived, resolver, rejecter) = Promise::with_resolvers();
        let fulfilled = {
            let resolver = resolver.clone();
            let rejecter = rejecter.clone();
            move |value| adopt(on_fulfilled(value), resolver, rejecter)
        };
        let rejected = move |reason| adopt(on_rejected(reason), resolver, rejecter);
        self.handle(Handler::new(fulfilled, rejected));
        derived
    }

    /// Chains a continuation on fulfillment. Rejections pass through to the
    /// derived promise untouched.
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Payload,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + Send + 'static,
    {
        self.then_both(on_fulfilled, Err)
    }

    /// Chains an infallible transformation of the fulfillment value.
    pub fn map<U, F>(&self, op: F) -> Promise<U, E>
    where
        U: Payload,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.then(move |value| Ok(Resolution::Value(op(value))))
    }

    /// Chains a continuation on rejection. Fulfillments pass through; a
    /// handled rejection puts the chain back on the fulfilled track.
    ///
    /// # Examples
    ///
    /// ```
    /// use thenable::{Promise, Resolution};
    /// use futures::executor::block_on;
    ///
    /// let recovered = Promise::<usize, String>::reject("boom".into())
    ///     .catch(|reason| Ok(Resolution::Value(reason.len())));
    /// assert_eq!(block_on(recovered), Ok(4));
    /// ```
    pub fn catch<R>(&self, on_rejected: R) -> Promise<T, E>
    where
        R: FnOnce(E) -> Result<Resolution<T, E>, E> + Send + 'static,
    {
        self.then_both(|value| Ok(Resolution::Value(value)), on_rejected)
    }

    /// A promise that always fulfills, with this promise's outcome.
    pub fn settled(&self) -> Promise<Settled<T, E>, E> {
        self.then_both(
            |value| Ok(Resolution::Value(Settled::Fulfilled(value))),
            |reason| Ok(Resolution::Value(Settled::Rejected(reason))),
        )
    }

    /// Runs `on_finally` on either outcome, then restores the original one.
    ///
    /// If `on_finally` returns a promise, the derived promise waits for it;
    /// that promise's own rejection is ignored. If `on_finally` returns
    /// `Err`, the derived promise is rejected with that error instead.
    pub fn finally<X, F>(&self, on_finally: F) -> Promise<T, E>
    where
        X: Payload,
        F: FnOnce() -> Result<Resolution<X, E>, E> + Send + 'static,
    {
        self.settled().then(move |outcome| {
            let gate = Promise::from_resolution(on_finally()?);
            let restored = gate.settled().then(move |_| match outcome {
                Settled::Fulfilled(value) => Ok(Resolution::Value(value)),
                Settled::Rejected(reason) => Err(reason),
            });
            Ok(Resolution::Deferred(restored))
        })
    }

    /// Settles the promise once, then runs the handlers that were queued on
    /// it through the thread's drain.
    pub(crate) fn settle(&self, outcome: Settled<T, E>) {
        let settled = match outcome.clone() {
            Settled::Fulfilled(value) => State::Fulfilled(value),
            Settled::Rejected(reason) => State::Rejected(reason),
        };
        let (handlers, wakers) = {
            let mut state = self.lock();
            match mem::replace(&mut *state, settled) {
                State::Pending { handlers, wakers } => (handlers, wakers),
                previous => {
                    *state = previous;
                    trace!("ignoring {} settlement of a settled promise", outcome.status());
                    return;
                }
            }
        };
        trace!(
            "promise {}, draining {} handlers and {} wakers",
            outcome.status(),
            handlers.len(),
            wakers.len()
        );
        for waker in wakers {
            waker.wake();
        }
        drain::run(handlers.into_iter().map(|handler| {
            let outcome = outcome.clone();
            Box::new(move || handler.invoke(outcome)) as Job
        }));
    }

    /// Queues `handler` while pending, otherwise runs it now with the
    /// outcome.
    fn handle(&self, handler: Handler<T, E>) {
        let mut state = self.lock();
        let outcome = match &mut *state {
            State::Pending { handlers, .. } => {
                handlers.push(handler);
                return;
            }
            State::Fulfilled(value) => Settled::Fulfilled(value.clone()),
            State::Rejected(reason) => Settled::Rejected(reason.clone()),
        };
        drop(state);
        handler.invoke(outcome);
    }

    /// Registers `waker` to be woken on settlement, or hands back the
    /// outcome if there is one already.
    pub(crate) fn poll_outcome(&self, waker: &Waker) -> Option<Result<T, E>> {
        match &mut *self.lock() {
            State::Pending { wakers, .. } => {
                if !wakers.iter().any(|w| w.will_wake(waker)) {
                    wakers.push(waker.clone());
                }
                None
            }
            State::Fulfilled(value) => Some(Ok(value.clone())),
            State::Rejected(reason) => Some(Err(reason.clone())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T, E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Payload, E: Payload> Promise<Promise<T, E>, E> {
    /// Adopts the outcome of the inner promise.
    pub fn flatten(&self) -> Promise<T, E> {
        self.then(|inner| Ok(Resolution::Deferred(inner)))
    }
}

/// Settles a derived promise with the result of one of its handler's
/// branches, waiting on the result first if it is itself a promise.
fn adopt<U: Payload, E: Payload>(
    result: Result<Resolution<U, E>, E>,
    resolver: Resolver<U, E>,
    rejecter: Rejecter<U, E>,
) {
    match result {
        Ok(Resolution::Value(value)) => resolver.resolve(value),
        Ok(Resolution::Deferred(inner)) => inner.handle(Handler::new(
            move |value| resolver.resolve(value),
            move |reason| rejecter.reject(reason),
        )),
        Err(reason) => {
            debug!("continuation failed, rejecting derived promise");
            rejecter.reject(reason)
        }
    }
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner.try_lock().as_deref() {
            Ok(State::Pending { .. }) => "pending",
            Ok(State::Fulfilled(_)) => "fulfilled",
            Ok(State::Rejected(_)) => "rejected",
            Err(_) => "<locked>",
        };
        f.debug_struct("Promise").field("state", &state).finish()
    }
}

impl<T, E> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Value(_) => f.write_str("Value(..)"),
            Resolution::Deferred(promise) => f.debug_tuple("Deferred").field(promise).finish(),
        }
    }
}
