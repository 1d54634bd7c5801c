//! Sequence driver
//!
//! `LazySequence` owns a boxed producer and centralizes the state machine:
//! buffering, sticky failure, depletion, splicing and close-once semantics
//! live here so producers stay simple.

use std::collections::VecDeque;

use crate::errors::{EvalError, EvalResult};

use super::sources::{FilterMapProducer, IterProducer, MapProducer};
use super::{Principal, Producer, SequenceState, Step};

/// A pull-based stream of values owned by a principal
pub struct LazySequence<T> {
    principal: Principal,
    state: SequenceState,
    buffer: VecDeque<T>,
    failure: Option<EvalError>,
    producer: Option<Box<dyn Producer<T>>>,
}

impl<T: Send + 'static> LazySequence<T> {
    pub fn new(principal: Principal, producer: impl Producer<T> + 'static) -> Self {
        Self {
            principal,
            state: SequenceState::Pending,
            buffer: VecDeque::new(),
            failure: None,
            producer: Some(Box::new(producer)),
        }
    }

    /// A sequence with no elements
    pub fn empty(principal: Principal) -> Self {
        Self {
            principal,
            state: SequenceState::Depleted,
            buffer: VecDeque::new(),
            failure: None,
            producer: None,
        }
    }

    /// A sequence of exactly one element
    pub fn once(principal: Principal, value: T) -> Self {
        Self {
            principal,
            state: SequenceState::ResultsAvailable,
            buffer: VecDeque::from([value]),
            failure: None,
            producer: None,
        }
    }

    /// A sequence that raises `error` on the first and every later pull
    pub fn failed(principal: Principal, error: EvalError) -> Self {
        Self {
            principal,
            state: SequenceState::Failed,
            buffer: VecDeque::new(),
            failure: Some(error),
            producer: None,
        }
    }

    /// A sequence over an in-memory iterator
    pub fn from_iter<I>(principal: Principal, iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::new(principal, IterProducer::new(iter.into_iter()))
    }

    pub fn principal(&self) -> Principal {
        self.principal
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Pulls the next element.
    ///
    /// Returns `None` at depletion. A previously raised failure is re-raised
    /// verbatim, never recomputed.
    pub async fn try_advance(&mut self) -> EvalResult<Option<T>> {
        loop {
            if let Some(value) = self.buffer.pop_front() {
                if self.buffer.is_empty() {
                    self.state = if self.producer.is_some() {
                        SequenceState::Pending
                    } else {
                        SequenceState::Depleted
                    };
                }
                return Ok(Some(value));
            }
            if let Some(error) = &self.failure {
                self.state = SequenceState::Failed;
                return Err(error.clone());
            }
            let Some(producer) = self.producer.as_mut() else {
                self.state = SequenceState::Depleted;
                return Ok(None);
            };
            match producer.next().await {
                Ok(Step::Item(value)) => {
                    self.state = SequenceState::Pending;
                    return Ok(Some(value));
                }
                Ok(Step::Continue) => continue,
                Ok(Step::Done) => {
                    self.release_producer();
                    self.state = SequenceState::Depleted;
                    return Ok(None);
                }
                Ok(Step::Become(next)) => {
                    self.splice(next);
                }
                Err(error) => {
                    self.fail(error.clone());
                    return Err(error);
                }
            }
        }
    }

    /// Advances internal computation without being required to produce.
    ///
    /// A produced value is buffered for the next `try_advance`.
    pub async fn step(&mut self) -> EvalResult<SequenceState> {
        if !self.buffer.is_empty() {
            self.state = SequenceState::ResultsAvailable;
            return Ok(self.state);
        }
        if let Some(error) = &self.failure {
            self.state = SequenceState::Failed;
            return Err(error.clone());
        }
        let Some(producer) = self.producer.as_mut() else {
            self.state = SequenceState::Depleted;
            return Ok(self.state);
        };
        match producer.next().await {
            Ok(Step::Item(value)) => {
                self.buffer.push_back(value);
                self.state = SequenceState::ResultsAvailable;
            }
            Ok(Step::Continue) => {
                self.state = SequenceState::Pending;
            }
            Ok(Step::Done) => {
                self.release_producer();
                self.state = SequenceState::Depleted;
            }
            Ok(Step::Become(next)) => {
                self.splice(next);
                self.state = if !self.buffer.is_empty() {
                    SequenceState::ResultsAvailable
                } else if self.failure.is_some() {
                    SequenceState::Failed
                } else if self.producer.is_some() {
                    SequenceState::Pending
                } else {
                    SequenceState::Depleted
                };
            }
            Err(error) => {
                self.fail(error.clone());
                return Err(error);
            }
        }
        Ok(self.state)
    }

    /// Releases resources and cancels outstanding computation.
    ///
    /// Idempotent; cascades into nested sequences through producer ownership
    /// (dropping a producer drops the sequences it holds, which close in
    /// their own `Drop`). Pulling after close yields depletion, not errors.
    pub fn close(&mut self) {
        self.release_producer();
        self.buffer.clear();
        self.failure = None;
        self.state = SequenceState::Depleted;
    }

    /// Maps every element through `f`, preserving laziness and principal
    pub fn map<U, F>(self, f: F) -> LazySequence<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        let principal = self.principal;
        LazySequence::new(principal, MapProducer::new(self, f))
    }

    /// Like `map`, dropping elements the function maps to `None`
    pub fn filter_map<U, F>(self, f: F) -> LazySequence<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static,
    {
        let principal = self.principal;
        LazySequence::new(principal, FilterMapProducer::new(self, f))
    }

    fn fail(&mut self, error: EvalError) {
        self.release_producer();
        self.failure = Some(error);
        self.state = SequenceState::Failed;
    }

    fn release_producer(&mut self) {
        if let Some(mut producer) = self.producer.take() {
            producer.close();
        }
    }

    /// Replaces this sequence's tail with `next` (producer hand-over)
    fn splice(&mut self, mut next: LazySequence<T>) {
        self.release_producer();
        self.buffer.extend(next.buffer.drain(..));
        self.failure = next.failure.take();
        self.producer = next.producer.take();
        // disarm the donor so its Drop does not close the handed-over state
        next.state = SequenceState::Depleted;
    }
}

impl<T> Drop for LazySequence<T> {
    fn drop(&mut self) {
        if let Some(mut producer) = self.producer.take() {
            producer.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorageError;

    fn principal() -> Principal {
        Principal::new()
    }

    #[tokio::test]
    async fn test_n_elements_then_depletion() {
        let mut seq = LazySequence::from_iter(principal(), vec![1, 2, 3]);
        assert_eq!(seq.try_advance().await.unwrap(), Some(1));
        assert_eq!(seq.try_advance().await.unwrap(), Some(2));
        assert_eq!(seq.try_advance().await.unwrap(), Some(3));
        assert_eq!(seq.try_advance().await.unwrap(), None);
        assert_eq!(seq.state(), SequenceState::Depleted);
        // pulling again stays depleted
        assert_eq!(seq.try_advance().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_step_buffers_result() {
        let mut seq = LazySequence::from_iter(principal(), vec![7]);
        assert_eq!(seq.step().await.unwrap(), SequenceState::ResultsAvailable);
        assert_eq!(seq.state(), SequenceState::ResultsAvailable);
        assert_eq!(seq.try_advance().await.unwrap(), Some(7));
        assert_eq!(seq.step().await.unwrap(), SequenceState::Depleted);
    }

    #[tokio::test]
    async fn test_failure_is_sticky() {
        let error: EvalError = StorageError::Failed("disk gone".into()).into();
        let mut seq: LazySequence<i64> = LazySequence::failed(principal(), error.clone());
        assert_eq!(seq.try_advance().await.unwrap_err(), error);
        assert_eq!(seq.state(), SequenceState::Failed);
        // re-raised, not recomputed
        assert_eq!(seq.try_advance().await.unwrap_err(), error);
    }

    #[tokio::test]
    async fn test_close_midway_is_exception_free() {
        let mut seq = LazySequence::from_iter(principal(), vec![1, 2, 3]);
        assert_eq!(seq.try_advance().await.unwrap(), Some(1));
        seq.close();
        assert_eq!(seq.state(), SequenceState::Depleted);
        assert_eq!(seq.try_advance().await.unwrap(), None);
        // close is idempotent
        seq.close();
    }

    #[tokio::test]
    async fn test_once_and_empty() {
        let mut one = LazySequence::once(principal(), 42);
        assert_eq!(one.state(), SequenceState::ResultsAvailable);
        assert_eq!(one.try_advance().await.unwrap(), Some(42));
        assert_eq!(one.try_advance().await.unwrap(), None);

        let mut none: LazySequence<i64> = LazySequence::empty(principal());
        assert_eq!(none.try_advance().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_map_preserves_order_and_laziness() {
        let mut seq = LazySequence::from_iter(principal(), vec![1, 2, 3]).map(|v| v * 10);
        assert_eq!(seq.try_advance().await.unwrap(), Some(10));
        assert_eq!(seq.try_advance().await.unwrap(), Some(20));
        assert_eq!(seq.try_advance().await.unwrap(), Some(30));
        assert_eq!(seq.try_advance().await.unwrap(), None);
    }

    /// Producer that yields one element and then becomes another sequence.
    struct TailHandOver {
        yielded: bool,
    }

    impl Producer<i64> for TailHandOver {
        fn next(&mut self) -> futures_util::future::BoxFuture<'_, EvalResult<Step<i64>>> {
            Box::pin(async move {
                if !self.yielded {
                    self.yielded = true;
                    Ok(Step::Item(1))
                } else {
                    Ok(Step::Become(LazySequence::from_iter(
                        Principal::new(),
                        vec![2, 3],
                    )))
                }
            })
        }
    }

    #[tokio::test]
    async fn test_become_splices_tail() {
        let mut seq = LazySequence::new(principal(), TailHandOver { yielded: false });
        assert_eq!(seq.try_advance().await.unwrap(), Some(1));
        assert_eq!(seq.try_advance().await.unwrap(), Some(2));
        assert_eq!(seq.try_advance().await.unwrap(), Some(3));
        assert_eq!(seq.try_advance().await.unwrap(), None);
    }
}
