use std::fmt;

/// Where a promise is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

impl PromiseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromiseState::Pending => "pending",
            PromiseState::Fulfilled => "fulfilled",
            PromiseState::Rejected => "rejected",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, PromiseState::Pending)
    }
}

impl fmt::Display for PromiseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The final outcome of a promise.
///
/// This is also the record [`all_settled`](crate::all_settled) reports for
/// each of its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T, E> {
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Settled<T, E> {
    pub fn status(&self) -> PromiseState {
        match self {
            Settled::Fulfilled(_) => PromiseState::Fulfilled,
            Settled::Rejected(_) => PromiseState::Rejected,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settled::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Settled::Rejected(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Settled::Fulfilled(value) => Some(value),
            Settled::Rejected(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&E> {
        match self {
            Settled::Fulfilled(_) => None,
            Settled::Rejected(reason) => Some(reason),
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Settled::Fulfilled(value) => Ok(value),
            Settled::Rejected(reason) => Err(reason),
        }
    }
}

impl<T, E> From<Result<T, E>> for Settled<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Settled::Fulfilled(value),
            Err(reason) => Settled::Rejected(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PromiseState, Settled};

    #[test]
    fn test_status_strings() {
        assert_eq!(PromiseState::Pending.to_string(), "pending");
        assert_eq!(PromiseState::Fulfilled.to_string(), "fulfilled");
        assert_eq!(PromiseState::Rejected.to_string(), "rejected");
    }

    #[test]
    fn test_settled_accessors() {
        let ok: Settled<i32, &str> = Ok(1).into();
        assert_eq!(ok.status(), PromiseState::Fulfilled);
        assert_eq!(ok.value(), Some(&1));
        assert_eq!(ok.reason(), None);

        let err: Settled<i32, &str> = Err("x").into();
        assert_eq!(err.status(), PromiseState::Rejected);
        assert_eq!(err.reason(), Some(&"x"));
        assert_eq!(err.into_result(), Err("x"));
    }
}
