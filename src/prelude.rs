//! Convenient re-exports for common Second Wind types.
pub use crate::{
    error::RetryFailure,
    kind::Kinded,
    listener::{RetryListener, TracingListener},
    retry::{BuildError, RetryBuilder, RetryLayer, RetryOperator, RetryService},
    sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper},
};
