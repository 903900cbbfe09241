#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Second Wind
//!
//! Bounded, observable retry for async Rust: wrap a flaky operation with a
//! fixed-delay attempt loop, an error-kind allow-list, a result-based retry
//! predicate, and an attempt listener.
//!
//! ## Features
//!
//! - **Attempt budget** with an always-execute-at-least-once guarantee
//! - **Fixed delay** between attempts, never before the first or after the last
//! - **Error-kind allow-lists** via the [`Kinded`] trait (empty = retry anything)
//! - **Result predicates** that force a retry after a successful attempt
//! - **Attempt listeners** observing each zero-based attempt index
//! - **Tower layer** applying the same semantics to any `Service`
//! - **Injectable sleepers** for fast, deterministic tests
//!
//! ## Quick Start
//!
//! ```rust
//! use secondwind::{RetryBuilder, RetryFailure};
//! use std::io;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let operator = RetryBuilder::new()
//!         .operation(|| async {
//!             // Your flaky async operation here
//!             Ok::<_, io::Error>("hello")
//!         })
//!         .max_attempts(3)
//!         .delay(Duration::from_millis(100))
//!         .retry_on([io::ErrorKind::TimedOut])
//!         .listener(|attempt: usize| println!("attempt {attempt}"))
//!         .build()
//!         .unwrap();
//!
//!     let result: Result<&str, RetryFailure<io::Error>> = operator.retry().await;
//!     assert_eq!(result.unwrap(), "hello");
//! }
//! ```

pub mod error;
pub mod kind;
pub mod listener;
pub mod prelude;
pub mod retry;
pub mod sleeper;

// Re-exports
pub use error::RetryFailure;
pub use kind::Kinded;
pub use listener::{RetryListener, TracingListener};
pub use retry::{BuildError, RetryBuilder, RetryLayer, RetryOperator, RetryService};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
