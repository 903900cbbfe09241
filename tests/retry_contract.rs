//! End-to-end contract tests for the retry operator.

use secondwind::prelude::*;
use std::error::Error;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn timeout_heavy_upstream_exhausts_the_budget() {
    init_tracing();

    let invocations = Arc::new(AtomicUsize::new(0));
    let invocations_clone = invocations.clone();
    let sleeper = TrackingSleeper::new();

    let operator = RetryBuilder::new()
        .operation(move || {
            let invocations = invocations_clone.clone();
            async move {
                let n = invocations.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(io::Error::new(io::ErrorKind::TimedOut, format!("timeout {}", n)))
            }
        })
        .max_attempts(3)
        .delay(Duration::from_millis(10))
        .retry_on([io::ErrorKind::TimedOut])
        .with_sleeper(sleeper.clone())
        .build()
        .expect("builder");

    let failure = operator.retry().await.unwrap_err();

    assert_eq!(invocations.load(Ordering::SeqCst), 3);
    assert_eq!(sleeper.recorded(), vec![Duration::from_millis(10), Duration::from_millis(10)]);
    assert!(failure.is_exhausted());
    assert_eq!(failure.attempts(), Some(3));
    assert_eq!(failure.inner().to_string(), "timeout 2", "wraps the last error");
}

#[tokio::test]
async fn mixed_errors_and_predicate_rejections_share_the_budget() {
    init_tracing();

    let invocations = Arc::new(AtomicUsize::new(0));
    let invocations_clone = invocations.clone();

    let operator = RetryBuilder::new()
        .operation(move || {
            let invocations = invocations_clone.clone();
            async move {
                match invocations.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(io::Error::new(io::ErrorKind::TimedOut, "cold start")),
                    1 => Ok("warming"),
                    _ => Ok("ready"),
                }
            }
        })
        .max_attempts(5)
        .retry_if(|state: &&str| *state == "warming")
        .with_sleeper(InstantSleeper)
        .build()
        .expect("builder");

    assert_eq!(operator.retry().await.unwrap(), "ready");
    assert_eq!(invocations.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn wrapped_error_is_reachable_through_the_source_chain() {
    let operator = RetryBuilder::new()
        .operation(|| async {
            Err::<(), _>(io::Error::new(io::ErrorKind::ConnectionRefused, "no listener on :9042"))
        })
        .max_attempts(2)
        .retry_on([io::ErrorKind::TimedOut])
        .build()
        .expect("builder");

    let failure = operator.retry().await.unwrap_err();
    assert!(failure.is_not_retryable());

    let source = failure.source().expect("cause must be preserved");
    assert_eq!(source.to_string(), "no listener on :9042");
}

#[tokio::test]
async fn listener_observes_the_whole_sequence() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let invocations = Arc::new(AtomicUsize::new(0));
    let invocations_clone = invocations.clone();

    let operator = RetryBuilder::new()
        .operation(move || {
            let invocations = invocations_clone.clone();
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok::<_, io::Error>(())
            }
        })
        .max_attempts(4)
        .retry_if(|_| true)
        .listener(move |attempt: usize| seen_clone.lock().unwrap().push(attempt))
        .with_sleeper(InstantSleeper)
        .build()
        .expect("builder");

    operator.retry().await.unwrap();

    assert_eq!(invocations.load(Ordering::SeqCst), 4);
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn cloned_operators_run_the_same_configuration() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let invocations_clone = invocations.clone();

    let operator = RetryBuilder::new()
        .operation(move || {
            let invocations = invocations_clone.clone();
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok::<_, io::Error>(())
            }
        })
        .max_attempts(2)
        .build()
        .expect("builder");

    let clone = operator.clone();
    operator.retry().await.unwrap();
    clone.retry().await.unwrap();

    assert_eq!(invocations.load(Ordering::SeqCst), 2);
}
