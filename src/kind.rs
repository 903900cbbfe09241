//! Error classification for retry allow-lists.
//!
//! Retry decisions on the error path are made by kind, not by value: every
//! error maps to a comparable tag, and the operator checks membership of that
//! tag in its configured allow-list.

use std::fmt;
use std::hash::Hash;

/// Maps an error to a comparable kind tag.
///
/// An operator built with a non-empty allow-list retries only errors whose
/// kind is in the list; any other error ends the sequence immediately. An
/// empty allow-list retries every kind.
pub trait Kinded {
    /// Tag type used for allow-list membership tests.
    type Kind: Clone + Eq + Hash + fmt::Debug + Send + Sync;

    /// Classify this error.
    fn kind(&self) -> Self::Kind;
}

impl Kinded for std::io::Error {
    type Kind = std::io::ErrorKind;

    fn kind(&self) -> Self::Kind {
        std::io::Error::kind(self)
    }
}
