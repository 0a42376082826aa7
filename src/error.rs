use thiserror::Error;

/// Rejection reason of [`any`](crate::any) when none of its inputs fulfill.
///
/// `reasons` holds each input's rejection reason in input order. It is empty
/// when `any` was given no promises at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("all promises were rejected: {reasons:?}")]
pub struct AggregateError<E> {
    pub reasons: Vec<E>,
}

impl<E> AggregateError<E> {
    pub fn new(reasons: Vec<E>) -> Self {
        Self { reasons }
    }

    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }
}
