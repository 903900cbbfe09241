//! Terminal error surfaced by the retry operator.
use std::fmt;

/// Failure that ends a retry sequence.
///
/// Always wraps the last underlying error; the original stays reachable for
/// diagnostics through [`std::error::Error::source`] and the accessors here.
///
/// Exhausting the attempt budget through predicate-driven retries does not
/// produce this error; that path returns the last computed result instead.
#[derive(Debug, Clone)]
pub enum RetryFailure<E> {
    /// A retryable error was still failing when the attempt budget ran out.
    Exhausted { attempts: usize, source: E },
    /// The error's kind was outside a non-empty allow-list; the remaining
    /// attempt budget was not spent.
    NotRetryable { source: E },
}

impl<E: fmt::Display> fmt::Display for RetryFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, source } => {
                write!(f, "retry exhausted after {} attempts; last error: {}", attempts, source)
            }
            Self::NotRetryable { source } => {
                write!(f, "error kind is not retryable: {}", source)
            }
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryFailure<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner())
    }
}

impl<E> RetryFailure<E> {
    pub(crate) fn exhausted(attempts: usize, source: E) -> Self {
        Self::Exhausted { attempts, source }
    }

    pub(crate) fn not_retryable(source: E) -> Self {
        Self::NotRetryable { source }
    }

    /// Check if this failure is due to exhausting the attempt budget.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Check if this failure is due to a non-retryable error kind.
    pub fn is_not_retryable(&self) -> bool {
        matches!(self, Self::NotRetryable { .. })
    }

    /// Number of attempts made before giving up, if the budget was exhausted.
    pub fn attempts(&self) -> Option<usize> {
        match self {
            Self::Exhausted { attempts, .. } => Some(*attempts),
            Self::NotRetryable { .. } => None,
        }
    }

    /// Borrow the underlying error.
    pub fn inner(&self) -> &E {
        match self {
            Self::Exhausted { source, .. } | Self::NotRetryable { source } => source,
        }
    }

    /// Consume the failure, returning the underlying error.
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { source, .. } | Self::NotRetryable { source } => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct DummyError(&'static str);

    impl fmt::Display for DummyError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for DummyError {}

    #[test]
    fn exhausted_display_names_attempts_and_last_error() {
        let err = RetryFailure::exhausted(3, DummyError("still down"));
        let msg = format!("{}", err);
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("still down"));
    }

    #[test]
    fn not_retryable_display_names_the_error() {
        let err = RetryFailure::not_retryable(DummyError("bad credentials"));
        let msg = format!("{}", err);
        assert!(msg.contains("not retryable"));
        assert!(msg.contains("bad credentials"));
    }

    #[test]
    fn source_exposes_the_wrapped_error() {
        let io_err = io::Error::new(io::ErrorKind::TimedOut, "slow upstream");
        let err = RetryFailure::exhausted(2, io_err);
        let source = err.source().expect("source should be present");
        assert_eq!(source.to_string(), "slow upstream");
    }

    #[test]
    fn accessors_distinguish_variants() {
        let exhausted = RetryFailure::exhausted(5, DummyError("x"));
        assert!(exhausted.is_exhausted());
        assert!(!exhausted.is_not_retryable());
        assert_eq!(exhausted.attempts(), Some(5));
        assert_eq!(exhausted.inner(), &DummyError("x"));

        let rejected = RetryFailure::not_retryable(DummyError("y"));
        assert!(rejected.is_not_retryable());
        assert!(!rejected.is_exhausted());
        assert_eq!(rejected.attempts(), None);
        assert_eq!(rejected.into_inner(), DummyError("y"));
    }
}
