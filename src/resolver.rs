use crate::{Payload, Promise, Settled};
use std::fmt;

/// Capability that fulfills the promise it was created with.
///
/// Handed to the executor by [`Promise::new`], or returned by
/// [`Promise::with_resolvers`]. It can be cloned and moved to other threads;
/// only the first settlement of the promise, through either capability, has
/// any effect.
pub struct Resolver<T, E> {
    promise: Promise<T, E>,
}

/// Capability that rejects the promise it was created with.
pub struct Rejecter<T, E> {
    promise: Promise<T, E>,
}

impl<T: Payload, E: Payload> Resolver<T, E> {
    pub(crate) fn new(promise: Promise<T, E>) -> Self {
        Self { promise }
    }

    /// Fulfills the promise with `value`. A no-op once it has settled.
    pub fn resolve(&self, value: T) {
        self.promise.settle(Settled::Fulfilled(value));
    }

    pub fn is_settled(&self) -> bool {
        self.promise.is_settled()
    }
}

impl<T: Payload, E: Payload> Rejecter<T, E> {
    pub(crate) fn new(promise: Promise<T, E>) -> Self {
        Self { promise }
    }

    /// Rejects the promise with `reason`. A no-op once it has settled.
    pub fn reject(&self, reason: E) {
        self.promise.settle(Settled::Rejected(reason));
    }

    pub fn is_settled(&self) -> bool {
        self.promise.is_settled()
    }
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self { promise: self.promise.clone() }
    }
}

impl<T, E> Clone for Rejecter<T, E> {
    fn clone(&self) -> Self {
        Self { promise: self.promise.clone() }
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

impl<T, E> fmt::Debug for Rejecter<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejecter").finish_non_exhaustive()
    }
}
