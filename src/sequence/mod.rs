//! Lazy sequence runtime
//!
//! Pull-based, cooperative production of a stream of values. Nothing is
//! computed before the consumer asks for it; a failure is sticky and
//! re-raised on every later pull; closing releases nested resources exactly
//! once and cascades into every nested sequence.
//!
//! Producer and consumer never run concurrently for one instance (everything
//! takes `&mut self`), so the runtime needs no internal locking. Distinct
//! sequences are fully independent. The only suspension point that leaves
//! the calling task is an `.await` on a storage future inside a producer.

mod lazy;
mod sources;

pub use lazy::LazySequence;
pub use sources::IterProducer;

use std::fmt;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EvalResult;

/// Opaque identity of the activity owning a sequence and its resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal(Uuid);

impl Principal {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Principal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// No buffered result; more computation may produce one
    Pending,
    /// At least one result is buffered and can be taken without computing
    ResultsAvailable,
    /// A failure was raised; it is re-raised on every later pull
    Failed,
    /// All results consumed, or the sequence was closed
    Depleted,
}

/// One unit of producer progress
pub enum Step<T> {
    /// A value was produced
    Item(T),
    /// Computation advanced without producing a value
    Continue,
    /// The producer is exhausted
    Done,
    /// Tail position: the runtime splices the given sequence in place of
    /// this producer instead of stacking another frame. Required so
    /// unbounded rule recursion does not pile up delegation layers.
    Become(LazySequence<T>),
}

/// Body of a lazy sequence
///
/// `next` is polled only when the consumer pulls; it may `.await` storage
/// futures. `close` is called exactly once and must release every nested
/// resource (nested sequences owned by the producer close on drop as well).
pub trait Producer<T>: Send {
    fn next(&mut self) -> BoxFuture<'_, EvalResult<Step<T>>>;

    fn close(&mut self) {}
}
