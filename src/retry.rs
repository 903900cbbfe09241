//! Retry operator implementation
//!
//! Wraps a fallible async operation in a bounded attempt loop.
//!
//! Semantics:
//! - `max_attempts` counts total attempts (initial try + retries). Zero is
//!   normalized to one, so the operation always runs at least once.
//! - A fixed `delay` separates consecutive attempts; it never runs before the
//!   first attempt or after the last. `Duration::ZERO` disables sleeping.
//! - Errors are classified by kind (`Kinded`). A non-empty allow-list retries
//!   only the listed kinds and fails fast on anything else; an empty
//!   allow-list retries every kind.
//! - An optional result predicate can force a retry after a successful
//!   attempt. Exhausting the budget this way returns the last computed result
//!   rather than an error.
//! - An optional listener observes the zero-based attempt index strictly
//!   before each invocation.
//! - Sleeper controls how delays are applied (production uses `TokioSleeper`;
//!   tests can inject `InstantSleeper`/`TrackingSleeper`).
//!
//! Invariants:
//! - The operation runs at least once and at most `max_attempts` times.
//! - `RetryFailure` is produced only on the error path, never after a
//!   predicate-driven exhaustion.
//!
//! Example
//! ```rust
//! use secondwind::RetryBuilder;
//! use std::io;
//! use std::time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let operator = RetryBuilder::new()
//!     .operation(|| async { Ok::<_, io::Error>("ready") })
//!     .max_attempts(3)
//!     .delay(Duration::from_millis(50))
//!     .retry_on([io::ErrorKind::TimedOut, io::ErrorKind::ConnectionReset])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(operator.retry().await.unwrap(), "ready");
//! # });
//! ```

use crate::error::RetryFailure;
use crate::kind::Kinded;
use crate::listener::RetryListener;
use crate::sleeper::{Sleeper, TokioSleeper};
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_layer::Layer;
use tower_service::Service;

type Operation<T, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Retry operator combining an operation, attempt budget, fixed delay,
/// error-kind allow-list, result predicate, and attempt listener.
///
/// Built instances are immutable; a single operator may be invoked repeatedly
/// and concurrently, each invocation owning its own attempt state.
pub struct RetryOperator<T, E: Kinded> {
    operation: Operation<T, E>,
    max_attempts: usize,
    delay: Duration,
    retry_predicate: Option<Predicate<T>>,
    retry_on: HashSet<E::Kind>,
    listener: Option<Arc<dyn RetryListener>>,
    sleeper: Arc<dyn Sleeper>,
}

impl<T, E: Kinded> Clone for RetryOperator<T, E> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
            max_attempts: self.max_attempts,
            delay: self.delay,
            retry_predicate: self.retry_predicate.clone(),
            retry_on: self.retry_on.clone(),
            listener: self.listener.clone(),
            sleeper: self.sleeper.clone(),
        }
    }
}

impl<T, E: Kinded> std::fmt::Debug for RetryOperator<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryOperator")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .field("retry_on", &self.retry_on)
            .field("retry_predicate", &self.retry_predicate.is_some())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl<T, E> RetryOperator<T, E>
where
    T: Send + 'static,
    E: std::error::Error + Kinded + Send + Sync + 'static,
{
    /// Construct a new builder with defaults.
    pub fn builder() -> RetryBuilder<T, E> {
        RetryBuilder::new()
    }

    /// Run the attempt loop until a result is accepted, the budget is
    /// exhausted, or a non-retryable error occurs.
    ///
    /// Cancellation follows normal future semantics: dropping the returned
    /// future stops the sequence, including mid-delay. No ambient interrupt
    /// signal is consulted.
    pub async fn retry(&self) -> Result<T, RetryFailure<E>> {
        let mut attempt = 0usize;
        let mut last_result = None;

        while attempt < self.max_attempts {
            if let Some(listener) = &self.listener {
                listener.on_retry(attempt);
            }
            match (self.operation)().await {
                Ok(result) => match &self.retry_predicate {
                    Some(predicate) if predicate(&result) => {
                        tracing::debug!(attempt, "result flagged for retry by predicate");
                        last_result = Some(result);
                        attempt = self.advance(attempt).await;
                    }
                    // No predicate, or the predicate accepted the result.
                    _ => return Ok(result),
                },
                Err(e) => {
                    if self.retry_on.is_empty() || self.retry_on.contains(&e.kind()) {
                        attempt = self.advance(attempt).await;
                        if attempt == self.max_attempts {
                            tracing::warn!(
                                attempts = self.max_attempts,
                                error = %e,
                                "retry budget exhausted"
                            );
                            return Err(RetryFailure::exhausted(self.max_attempts, e));
                        }
                        tracing::debug!(attempt, error = %e, "retrying after error");
                    } else {
                        tracing::debug!(kind = ?e.kind(), "error kind not in allow-list");
                        return Err(RetryFailure::not_retryable(e));
                    }
                }
            }
        }

        match last_result {
            Some(result) => Ok(result),
            // The loop can only exit here after a predicate-driven retry, and
            // that path always stores its result first.
            None => unreachable!("retry loop exited without a stored result"),
        }
    }

    /// Advance the attempt counter, sleeping only if attempts remain.
    async fn advance(&self, attempt: usize) -> usize {
        let next = attempt + 1;
        if next < self.max_attempts && !self.delay.is_zero() {
            self.sleeper.sleep(self.delay).await;
        }
        next
    }
}

/// Errors produced while building a retry operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// No operation was supplied before `build()`.
    #[error("an operation is required; supply one with RetryBuilder::operation")]
    MissingOperation,
}

/// Builder for [`RetryOperator`].
///
/// Each setter overwrites any prior value for that field. Reuse is permitted;
/// every `build()` produces an independent operator sharing no mutable state.
pub struct RetryBuilder<T, E: Kinded> {
    operation: Option<Operation<T, E>>,
    max_attempts: usize,
    delay: Duration,
    retry_predicate: Option<Predicate<T>>,
    retry_on: HashSet<E::Kind>,
    listener: Option<Arc<dyn RetryListener>>,
    sleeper: Arc<dyn Sleeper>,
}

impl<T, E> RetryBuilder<T, E>
where
    T: Send + 'static,
    E: std::error::Error + Kinded + Send + Sync + 'static,
{
    /// Create a builder with defaults: one attempt, no delay, no predicate,
    /// empty allow-list, no listener.
    pub fn new() -> Self {
        Self {
            operation: None,
            max_attempts: 0,
            delay: Duration::ZERO,
            retry_predicate: None,
            retry_on: HashSet::new(),
            listener: None,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Set the operation to wrap. Mandatory.
    pub fn operation<Op, Fut>(mut self, operation: Op) -> Self
    where
        Op: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.operation =
            Some(Arc::new(move || -> BoxFuture<'static, Result<T, E>> { Box::pin(operation()) }));
        self
    }

    /// Total attempt budget. Zero is normalized to one at build time; the
    /// operation always executes at least once.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Fixed delay between consecutive attempts. `Duration::ZERO` (the
    /// default) disables sleeping entirely.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Predicate deciding, from a successful result, whether to retry anyway.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Error kinds eligible for retry. Leaving this empty retries any kind.
    /// Repeated calls replace the previous set.
    pub fn retry_on<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = E::Kind>,
    {
        self.retry_on = kinds.into_iter().collect();
        self
    }

    /// Listener notified before each attempt with the zero-based index.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: RetryListener + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Build the operator, validating that an operation was supplied.
    pub fn build(self) -> Result<RetryOperator<T, E>, BuildError> {
        let operation = self.operation.ok_or(BuildError::MissingOperation)?;
        Ok(RetryOperator {
            operation,
            // Always execute at least once.
            max_attempts: self.max_attempts.max(1),
            delay: self.delay,
            retry_predicate: self.retry_predicate,
            retry_on: self.retry_on,
            listener: self.listener,
            sleeper: self.sleeper,
        })
    }
}

impl<T, E> Default for RetryBuilder<T, E>
where
    T: Send + 'static,
    E: std::error::Error + Kinded + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Tower-native retry layer with the same loop semantics as
/// [`RetryOperator`]; the wrapped service plays the role of the operation.
pub struct RetryLayer<Res, E: Kinded> {
    max_attempts: usize,
    delay: Duration,
    retry_predicate: Option<Predicate<Res>>,
    retry_on: HashSet<E::Kind>,
    listener: Option<Arc<dyn RetryListener>>,
    sleeper: Arc<dyn Sleeper>,
}

impl<Res, E: Kinded> RetryLayer<Res, E> {
    /// Create a layer with the given attempt budget and inter-attempt delay.
    /// A zero budget is normalized to one; a zero delay disables sleeping.
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            retry_predicate: None,
            retry_on: HashSet::new(),
            listener: None,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Predicate deciding, from a successful response, whether to retry.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Res) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Error kinds eligible for retry; empty retries any kind.
    pub fn retry_on<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = E::Kind>,
    {
        self.retry_on = kinds.into_iter().collect();
        self
    }

    /// Listener notified before each attempt with the zero-based index.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: RetryListener + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    async fn advance(&self, attempt: usize) -> usize {
        let next = attempt + 1;
        if next < self.max_attempts && !self.delay.is_zero() {
            self.sleeper.sleep(self.delay).await;
        }
        next
    }
}

impl<Res, E: Kinded> Clone for RetryLayer<Res, E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            delay: self.delay,
            retry_predicate: self.retry_predicate.clone(),
            retry_on: self.retry_on.clone(),
            listener: self.listener.clone(),
            sleeper: self.sleeper.clone(),
        }
    }
}

/// Retry service produced by [`RetryLayer`].
pub struct RetryService<S, Res, E: Kinded> {
    inner: S,
    layer: RetryLayer<Res, E>,
}

impl<S: Clone, Res, E: Kinded> Clone for RetryService<S, Res, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), layer: self.layer.clone() }
    }
}

impl<S, Res, E, Request> Service<Request> for RetryService<S, Res, E>
where
    Request: Clone + Send + 'static,
    S: Service<Request, Response = Res> + Clone + Send + 'static,
    S::Error: Into<E> + Send,
    S::Future: Send + 'static,
    Res: Send + 'static,
    E: std::error::Error + Kinded + Send + Sync + 'static,
{
    type Response = Res;
    type Error = RetryFailure<E>;
    type Future = BoxFuture<'static, Result<Res, RetryFailure<E>>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        // Readiness failures are surfaced without classification or retry.
        self.inner.poll_ready(cx).map_err(|e| RetryFailure::not_retryable(e.into()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let layer = self.layer.clone();
        let mut inner = self.inner.clone();
        Box::pin(async move {
            let mut attempt = 0usize;
            let mut last_response = None;

            while attempt < layer.max_attempts {
                if let Some(listener) = &layer.listener {
                    listener.on_retry(attempt);
                }
                match inner.call(req.clone()).await {
                    Ok(response) => match &layer.retry_predicate {
                        Some(predicate) if predicate(&response) => {
                            last_response = Some(response);
                            attempt = layer.advance(attempt).await;
                        }
                        _ => return Ok(response),
                    },
                    Err(err) => {
                        let e: E = err.into();
                        if layer.retry_on.is_empty() || layer.retry_on.contains(&e.kind()) {
                            attempt = layer.advance(attempt).await;
                            if attempt == layer.max_attempts {
                                return Err(RetryFailure::exhausted(layer.max_attempts, e));
                            }
                        } else {
                            return Err(RetryFailure::not_retryable(e));
                        }
                    }
                }
            }

            match last_response {
                Some(response) => Ok(response),
                None => unreachable!("retry loop exited without a stored response"),
            }
        })
    }
}

impl<S, Res, E> Layer<S> for RetryLayer<Res, E>
where
    E: Kinded,
{
    type Service = RetryService<S, Res, E>;

    fn layer(&self, service: S) -> Self::Service {
        RetryService { inner: service, layer: self.clone() }
    }
}
