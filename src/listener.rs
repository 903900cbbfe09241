//! Attempt observation callbacks.

/// Observer notified before every attempt, including the first.
///
/// `attempt` is the zero-based index of the attempt about to run. The callback
/// executes synchronously on the calling task, strictly before the operation
/// is invoked. A panic inside the listener unwinds into the caller and aborts
/// the retry sequence; the operator does not guard against it.
pub trait RetryListener: Send + Sync {
    fn on_retry(&self, attempt: usize);
}

impl<F> RetryListener for F
where
    F: Fn(usize) + Send + Sync,
{
    fn on_retry(&self, attempt: usize) {
        self(attempt)
    }
}

/// Stock listener that emits a `tracing` debug event per attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl RetryListener for TracingListener {
    fn on_retry(&self, attempt: usize) {
        tracing::debug!(attempt, "starting attempt");
    }
}
