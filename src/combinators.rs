//! Combinators that join many promises into one.
//!
//! They only use the public chaining API of [`Promise`]: each input gets a
//! continuation that writes into shared bookkeeping and settles the output
//! through its capabilities.
use crate::{AggregateError, Payload, Promise, Resolution, Settled};
use log::trace;
use std::sync::{Arc, Mutex, PoisonError};

/// Positional results, filled in whatever order the inputs complete.
struct Slots<T> {
    values: Vec<Option<T>>,
    remaining: usize,
}

impl<T> Slots<T> {
    fn new(len: usize) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            values: (0..len).map(|_| None).collect(),
            remaining: len,
        }))
    }

    /// Stores `value` at `index`, returning every value once all slots are
    /// filled.
    fn fill(&mut self, index: usize, value: T) -> Option<Vec<T>> {
        if self.values[index].replace(value).is_none() {
            self.remaining -= 1;
        }
        if self.remaining > 0 {
            return None;
        }
        Some(self.values.drain(..).flatten().collect())
    }
}

fn fill<T>(slots: &Mutex<Slots<T>>, index: usize, value: T) -> Option<Vec<T>> {
    slots
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .fill(index, value)
}

/// Fulfills with every input's value, in input order, once all of them
/// fulfill. Rejects with the first rejection.
///
/// An empty input fulfills with an empty vector.
///
/// # Examples
///
/// ```
/// use thenable::{all, Promise, Settled};
///
/// let (slow, resolve, _reject) = Promise::<i32, String>::with_resolvers();
/// let joined = all(vec![slow, Promise::resolve(20)]);
/// resolve.resolve(10);
/// assert_eq!(joined.peek(), Some(Settled::Fulfilled(vec![10, 20])));
/// ```
pub fn all<T, E, I>(promises: I) -> Promise<Vec<T>, E>
where
    T: Payload,
    E: Payload,
    I: IntoIterator<Item = Promise<T, E>>,
{
    let promises: Vec<_> = promises.into_iter().collect();
    Promise::new(move |resolve, reject| {
        if promises.is_empty() {
            resolve.resolve(Vec::new());
            return Ok(());
        }
        let slots = Slots::new(promises.len());
        for (index, promise) in promises.into_iter().enumerate() {
            let slots = slots.clone();
            let resolve = resolve.clone();
            let reject = reject.clone();
            promise
                .then(move |value| {
                    if let Some(values) = fill(&slots, index, value) {
                        trace!("all: every input fulfilled");
                        resolve.resolve(values);
                    }
                    Ok(Resolution::Value(()))
                })
                .catch(move |reason| {
                    reject.reject(reason);
                    Ok(Resolution::Value(()))
                });
        }
        Ok(())
    })
}

/// Adopts the outcome of whichever input settles first.
///
/// An empty input never settles.
pub fn race<T, E, I>(promises: I) -> Promise<T, E>
where
    T: Payload,
    E: Payload,
    I: IntoIterator<Item = Promise<T, E>>,
{
    Promise::new(move |resolve, reject| {
        for promise in promises {
            let resolve = resolve.clone();
            let reject = reject.clone();
            promise
                .then(move |value| {
                    resolve.resolve(value);
                    Ok(Resolution::Value(()))
                })
                .catch(move |reason| {
                    reject.reject(reason);
                    Ok(Resolution::Value(()))
                });
        }
        Ok(())
    })
}

/// Fulfills with every input's outcome, in input order, once all of them
/// settle. Never rejects.
///
/// # Examples
///
/// ```
/// use thenable::{all_settled, Promise, Settled};
///
/// let outcomes = all_settled(vec![Promise::resolve(1), Promise::reject("x")]);
/// assert_eq!(
///     outcomes.peek(),
///     Some(Settled::Fulfilled(vec![Settled::Fulfilled(1), Settled::Rejected("x")])),
/// );
/// ```
pub fn all_settled<T, E, I>(promises: I) -> Promise<Vec<Settled<T, E>>, E>
where
    T: Payload,
    E: Payload,
    I: IntoIterator<Item = Promise<T, E>>,
{
    all(promises.into_iter().map(|promise| promise.settled()))
}

/// Fulfills with the first input to fulfill. Rejects with every reason, in
/// input order, once all inputs reject.
///
/// An empty input rejects right away with an empty [`AggregateError`].
pub fn any<T, E, I>(promises: I) -> Promise<T, AggregateError<E>>
where
    T: Payload,
    E: Payload,
    I: IntoIterator<Item = Promise<T, E>>,
{
    let promises: Vec<_> = promises.into_iter().collect();
    Promise::new(move |resolve, reject| {
        if promises.is_empty() {
            return Err(AggregateError::new(Vec::new()));
        }
        let slots = Slots::new(promises.len());
        for (index, promise) in promises.into_iter().enumerate() {
            let slots = slots.clone();
            let resolve = resolve.clone();
            let reject = reject.clone();
            promise
                .then(move |value| {
                    resolve.resolve(value);
                    Ok(Resolution::Value(()))
                })
                .catch(move |reason| {
                    if let Some(reasons) = fill(&slots, index, reason) {
                        trace!("any: every input rejected");
                        reject.reject(AggregateError::new(reasons));
                    }
                    Ok(Resolution::Value(()))
                });
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::{all, all_settled, any, race};
    use crate::{AggregateError, Promise, PromiseState, Settled};
    use futures::executor::block_on;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_all_keeps_input_order() {
        let (a, resolve_a, _) = Promise::<i32, &str>::with_resolvers();
        let (b, resolve_b, _) = Promise::<i32, &str>::with_resolvers();
        let (c, resolve_c, _) = Promise::<i32, &str>::with_resolvers();
        let joined = all(vec![a, b, c]);
        resolve_c.resolve(30);
        resolve_a.resolve(10);
        assert_eq!(joined.state(), PromiseState::Pending);
        resolve_b.resolve(20);
        assert_eq!(joined.peek(), Some(Settled::Fulfilled(vec![10, 20, 30])));
    }

    #[test]
    fn test_all_rejects_on_first_rejection() {
        let (a, _, reject_a) = Promise::<i32, &str>::with_resolvers();
        let (b, _, reject_b) = Promise::<i32, &str>::with_resolvers();
        let joined = all(vec![a, b, Promise::pending()]);
        reject_b.reject("second");
        reject_a.reject("first");
        assert_eq!(joined.peek(), Some(Settled::Rejected("second")));
    }

    #[test]
    fn test_all_empty_fulfills() {
        let joined = all(Vec::<Promise<i32, ()>>::new());
        assert_eq!(joined.peek(), Some(Settled::Fulfilled(vec![])));
    }

    #[test]
    fn test_race_first_settlement_wins() {
        let (a, resolve_a, _) = Promise::<i32, &str>::with_resolvers();
        let (b, _, reject_b) = Promise::<i32, &str>::with_resolvers();
        let winner = race(vec![a, b]);
        reject_b.reject("fast");
        resolve_a.resolve(1);
        assert_eq!(winner.peek(), Some(Settled::Rejected("fast")));
    }

    #[test]
    fn test_race_empty_stays_pending() {
        let winner = race(Vec::<Promise<i32, ()>>::new());
        assert_eq!(winner.state(), PromiseState::Pending);
    }

    #[test]
    fn test_race_across_threads() {
        let slow = Promise::<&str, ()>::new(|resolve, _| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(200));
                resolve.resolve("slow");
            });
            Ok(())
        });
        let fast = Promise::<&str, ()>::new(|resolve, _| {
            thread::spawn(move || resolve.resolve("fast"));
            Ok(())
        });
        assert_eq!(block_on(race(vec![slow, fast])), Ok("fast"));
    }

    #[test]
    fn test_all_settled_never_rejects() {
        let (a, _, reject_a) = Promise::<i32, &str>::with_resolvers();
        let outcomes = all_settled(vec![a, Promise::resolve(2)]);
        assert_eq!(outcomes.state(), PromiseState::Pending);
        reject_a.reject("x");
        assert_eq!(
            outcomes.peek(),
            Some(Settled::Fulfilled(vec![Settled::Rejected("x"), Settled::Fulfilled(2)]))
        );
    }

    #[test]
    fn test_any_first_fulfillment_wins() {
        let (a, resolve_a, _) = Promise::<i32, &str>::with_resolvers();
        let first = any(vec![Promise::reject("x"), a, Promise::pending()]);
        assert_eq!(first.state(), PromiseState::Pending);
        resolve_a.resolve(5);
        assert_eq!(first.peek(), Some(Settled::Fulfilled(5)));
    }

    #[test]
    fn test_any_collects_reasons_in_input_order() {
        let (a, _, reject_a) = Promise::<i32, &str>::with_resolvers();
        let first = any(vec![a, Promise::reject("b")]);
        reject_a.reject("a");
        assert_eq!(
            first.peek(),
            Some(Settled::Rejected(AggregateError::new(vec!["a", "b"])))
        );
    }

    #[test]
    fn test_any_empty_rejects() {
        let first = any(Vec::<Promise<i32, ()>>::new());
        assert_eq!(first.peek(), Some(Settled::Rejected(AggregateError::new(vec![]))));
    }
}
