use crate::{Payload, Promise};
use std::{future::Future, pin::Pin, task::{Context, Poll}};

/// Awaiting a promise yields a clone of its outcome.
///
/// # Examples
///
/// ```
/// use thenable::Promise;
/// use futures::executor::block_on;
/// use std::thread;
///
/// let (promise, _resolve, reject) = Promise::<(), String>::with_resolvers();
/// let waiter = promise.clone();
/// let task1 = thread::spawn(move || block_on(async {
///     waiter.await
/// }));
/// reject.reject(String::from("💥"));
/// assert_eq!(task1.join().expect("The task1 thread has panicked"), Err("💥".into()));
/// ```
impl<T: Payload, E: Payload> Future for Promise<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.poll_outcome(cx.waker()) {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}
